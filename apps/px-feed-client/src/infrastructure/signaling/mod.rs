//! HTTP signaling adapter implementing `SignalingPort`.
//!
//! `POST <url>` with `{"sdp": ..., "type": ...}` and decode the answer from
//! the JSON response. Exactly one request per exchange; nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::application::ports::{SignalingError, SignalingPort};
use crate::domain::negotiation::{SdpType, SessionDescription};

/// Signaling client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSignalingClient {
    client: Client,
    url: String,
}

impl HttpSignalingClient {
    /// Create a client posting offers to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalingError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, SignalingError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| SignalingError::Transport {
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Endpoint receiving offers.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SignalingPort for HttpSignalingClient {
    async fn exchange(
        &self,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError> {
        tracing::debug!(url = %self.url, sdp_len = offer.sdp.len(), "posting offer");

        let response = self
            .client
            .post(&self.url)
            .json(offer)
            .send()
            .await
            .map_err(|e| transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport(format!("signaling endpoint returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport(format!("failed to read body: {e}")))?;

        decode_answer(&body)
    }
}

/// Decode a response body into a session description.
///
/// A body that is not JSON is a transport failure; JSON without a string
/// `sdp` and a known `type` is a malformed answer.
fn decode_answer(body: &str) -> Result<SessionDescription, SignalingError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| transport(format!("response is not JSON: {e}")))?;

    let sdp = value
        .get("sdp")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing string field `sdp`"))?;
    let sdp_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing string field `type`"))?;
    let sdp_type = SdpType::from_str_case_insensitive(sdp_type)
        .ok_or_else(|| malformed(format!("unknown description type {sdp_type:?}")))?;

    Ok(SessionDescription {
        sdp: sdp.to_string(),
        sdp_type,
    })
}

fn transport(message: impl Into<String>) -> SignalingError {
    SignalingError::Transport {
        message: message.into(),
    }
}

fn malformed(message: impl Into<String>) -> SignalingError {
    SignalingError::MalformedAnswer {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn keeps_endpoint_url() {
        let client =
            HttpSignalingClient::new("http://localhost:8182/offer", Some(Duration::from_secs(5)))
                .unwrap();
        assert_eq!(client.url(), "http://localhost:8182/offer");
    }

    #[test]
    fn decodes_answer() {
        let desc = decode_answer(r#"{"sdp":"v=0\r\n","type":"answer"}"#).unwrap();
        assert_eq!(desc, SessionDescription::answer("v=0\r\n"));
    }

    #[test]
    fn ignores_extra_fields() {
        let desc = decode_answer(r#"{"sdp":"v=0","type":"answer","id":7}"#).unwrap();
        assert_eq!(desc.sdp, "v=0");
    }

    #[test_case("<html>bad gateway</html>" ; "html body")]
    #[test_case("" ; "empty body")]
    fn non_json_is_transport_error(body: &str) {
        assert!(matches!(
            decode_answer(body),
            Err(SignalingError::Transport { .. })
        ));
    }

    #[test_case(r#"{"type":"answer"}"# ; "missing sdp")]
    #[test_case(r#"{"sdp":"v=0"}"# ; "missing type")]
    #[test_case(r#"{"sdp":42,"type":"answer"}"# ; "non string sdp")]
    #[test_case(r#"{"sdp":"v=0","type":"bogus"}"# ; "unknown type")]
    #[test_case("[]" ; "array body")]
    fn incomplete_json_is_malformed(body: &str) {
        assert!(matches!(
            decode_answer(body),
            Err(SignalingError::MalformedAnswer { .. })
        ));
    }
}
