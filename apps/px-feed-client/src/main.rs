//! Price Feed Client Binary
//!
//! Negotiates a data channel with the signaling endpoint and logs the price
//! stream until the channel closes or the process is interrupted.
//!
//! # Usage
//!
//! ```bash
//! PX_SIGNALING_URL=http://localhost:8182/offer cargo run --bin px-feed-client
//! ```
//!
//! # Environment Variables
//!
//! - `PX_SIGNALING_URL`: signaling endpoint (default: <http://localhost:8182/offer>)
//! - `PX_HISTORY_LEN`: retained update records (default: 10)
//! - `PX_CHANNEL_LABEL`: data channel label (default: marketPx)
//! - `PX_ICE_SERVERS`: comma-separated STUN/TURN URLs (default: none)
//! - `PX_SIGNALING_TIMEOUT_SECS`: HTTP timeout, 0 disables (default: 0)
//! - `PX_METRICS_PORT`: Prometheus port, 0 disables (default: 0)
//! - `OTEL_ENABLED`: export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: service name (default: px-feed-client)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use px_feed_client::application::ports::PeerConnectionPort;
use px_feed_client::infrastructure::telemetry;
use px_feed_client::{
    ClientConfig, FeedSession, HttpSignalingClient, PrometheusMetrics, SessionError, SessionState,
    WebRtcPeerConnection, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// How long a running session gets to wind down after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    let telemetry_guard = telemetry::init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        otlp_export = telemetry_guard.exporting(),
        "Starting price feed client"
    );

    let config = ClientConfig::from_env()?;
    log_config(&config);

    let _metrics_handle = init_metrics(config.metrics_port)?;

    let shutdown_token = CancellationToken::new();
    tokio::spawn(await_shutdown(shutdown_token.clone()));

    let signaling = Arc::new(HttpSignalingClient::new(
        config.signaling.url.clone(),
        config.signaling.timeout,
    )?);
    let transport: Arc<dyn PeerConnectionPort> =
        Arc::new(WebRtcPeerConnection::new(&config.transport.ice_servers).await?);
    let session = FeedSession::new(
        signaling.clone(),
        Arc::new(PrometheusMetrics),
        config.transport.channel_label.clone(),
        config.history_len,
    );

    let attempt_id = Uuid::new_v4();
    let span = tracing::info_span!("session", %attempt_id, url = %signaling.url());

    let run = session
        .run(Arc::clone(&transport), shutdown_token.clone())
        .instrument(span);
    tokio::pin!(run);

    let outcome = tokio::select! {
        result = &mut run => result,
        () = shutdown_token.cancelled() => {
            if let Ok(result) = tokio::time::timeout(SHUTDOWN_GRACE, &mut run).await {
                result
            } else {
                tracing::warn!("negotiation still in flight at shutdown, closing connection");
                transport.close().await?;
                return Ok(());
            }
        }
    };

    log_final_state(&session.store().snapshot());

    match outcome {
        Ok(summary) => {
            tracing::info!(
                accepted = summary.accepted,
                rejected = summary.rejected,
                keys = summary.keys,
                "Price feed client stopped"
            );
            Ok(())
        }
        Err(SessionError::Negotiation(e)) => {
            tracing::error!(stage = %e.stage(), error = %e, "Negotiation failed");
            Err(e.into())
        }
        Err(e) => {
            tracing::error!(error = %e, "Session failed");
            Err(e.into())
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        signaling_url = %config.signaling.url,
        history_len = config.history_len,
        channel_label = %config.transport.channel_label,
        ice_servers = config.transport.ice_servers.len(),
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    if let Some(timeout) = config.signaling.timeout {
        tracing::debug!(timeout_secs = timeout.as_secs(), "Signaling timeout enabled");
    }
}

/// Log the latest prices and negotiation observations.
fn log_final_state(state: &SessionState) {
    tracing::info!(
        gathering = %state.negotiation.gathering,
        connection = %state.negotiation.connection,
        signaling = %state.negotiation.signaling,
        "Final negotiation state"
    );
    for (key, value) in state.feed.snapshot.iter() {
        tracing::info!(key = %key, value = %value, "Final price");
    }
}

/// Load .env from the current directory or the nearest ancestor holding one.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir()
        && let Some(path) = cwd
            .ancestors()
            .skip(1)
            .map(|dir| dir.join(".env"))
            .find(|path| path.exists())
    {
        let _ = dotenvy::from_path(&path);
    }
}

/// Wait for SIGINT or SIGTERM, then cancel `shutdown_token`.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }

    shutdown_token.cancel();
}
