//! HTTP Signaling Integration Tests
//!
//! Runs the reqwest signaling client against a local mock endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use px_feed_client::{HttpSignalingClient, SdpType, SessionDescription, SignalingError, SignalingPort};

const OFFER_SDP: &str = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n";
const ANSWER_SDP: &str = "v=0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\na=setup:active\r\n";

fn client_for(server: &MockServer, timeout: Option<Duration>) -> HttpSignalingClient {
    HttpSignalingClient::new(format!("{}/offer", server.uri()), timeout).unwrap()
}

#[tokio::test]
async fn test_posts_offer_and_decodes_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/offer"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "sdp": OFFER_SDP, "type": "offer" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sdp": ANSWER_SDP, "type": "answer" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let answer = client
        .exchange(&SessionDescription::offer(OFFER_SDP))
        .await
        .unwrap();

    assert_eq!(answer.sdp, ANSWER_SDP);
    assert_eq!(answer.sdp_type, SdpType::Answer);
}

#[tokio::test]
async fn test_accepts_uppercase_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/offer"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sdp": ANSWER_SDP, "type": "ANSWER" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let answer = client
        .exchange(&SessionDescription::offer(OFFER_SDP))
        .await
        .unwrap();

    assert_eq!(answer.sdp_type, SdpType::Answer);
}

#[tokio::test]
async fn test_non_json_body_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>bad gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client
        .exchange(&SessionDescription::offer(OFFER_SDP))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalingError::Transport { .. }), "{err:?}");
}

#[tokio::test]
async fn test_missing_sdp_is_malformed_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": "answer" })))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client
        .exchange(&SessionDescription::offer(OFFER_SDP))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalingError::MalformedAnswer { .. }), "{err:?}");
}

#[tokio::test]
async fn test_error_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "sdp": ANSWER_SDP, "type": "answer" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client
        .exchange(&SessionDescription::offer(OFFER_SDP))
        .await
        .unwrap_err();

    let SignalingError::Transport { message } = err else {
        panic!("expected transport error, got {err:?}");
    };
    assert!(message.contains("503"), "{message}");
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "sdp": ANSWER_SDP, "type": "answer" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Some(Duration::from_millis(50)));
    let err = client
        .exchange(&SessionDescription::offer(OFFER_SDP))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalingError::Transport { .. }), "{err:?}");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let client = HttpSignalingClient::new("http://127.0.0.1:9/offer", Some(Duration::from_secs(2)))
        .unwrap();

    let err = client
        .exchange(&SessionDescription::offer(OFFER_SDP))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalingError::Transport { .. }), "{err:?}");
}
