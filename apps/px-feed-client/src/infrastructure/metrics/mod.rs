//! Prometheus Metrics
//!
//! # Metrics
//!
//! - `px_feed_messages_received_total`: frames applied to the feed
//! - `px_feed_messages_rejected_total{reason}`: malformed frames dropped
//! - `px_feed_negotiations_total{outcome}`: negotiation attempts
//! - `px_feed_negotiation_seconds`: negotiation duration
//! - `px_feed_snapshot_keys`: distinct security keys seen
//! - `px_feed_interarrival_seconds`: gap between accepted frames
//!
//! Recording functions are no-ops until a recorder is installed, so library
//! code and tests can call them freely.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::application::ports::SessionMetricsPort;

/// Install the Prometheus recorder.
///
/// With a non-zero `port` the exporter serves `/metrics` on that port and no
/// handle is returned. With `port == 0` nothing is bound and the returned
/// handle can render the metrics on demand.
///
/// # Errors
///
/// Returns [`BuildError`] if a recorder is already installed or the listener
/// cannot be bound.
pub fn init_metrics(port: u16) -> Result<Option<PrometheusHandle>, BuildError> {
    let builder = PrometheusBuilder::new();
    let handle = if port == 0 {
        Some(builder.install_recorder()?)
    } else {
        builder
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()?;
        None
    };

    register_metrics();
    Ok(handle)
}

fn register_metrics() {
    describe_counter!(
        "px_feed_messages_received_total",
        "Price frames applied to the feed state"
    );
    describe_counter!(
        "px_feed_messages_rejected_total",
        "Malformed price frames dropped, by reason"
    );
    describe_counter!(
        "px_feed_negotiations_total",
        "Negotiation attempts, by outcome"
    );
    describe_histogram!(
        "px_feed_negotiation_seconds",
        "Time from offer creation to remote description applied"
    );
    describe_gauge!(
        "px_feed_snapshot_keys",
        "Distinct security keys in the price snapshot"
    );
    describe_histogram!(
        "px_feed_interarrival_seconds",
        "Gap between consecutive accepted price frames"
    );
}

/// Record an accepted frame.
pub fn record_message_received() {
    counter!("px_feed_messages_received_total").increment(1);
}

/// Record a dropped frame.
pub fn record_message_rejected(reason: &'static str) {
    counter!("px_feed_messages_rejected_total", "reason" => reason).increment(1);
}

/// Record a finished negotiation attempt.
pub fn record_negotiation(outcome: &'static str, duration: Duration) {
    counter!("px_feed_negotiations_total", "outcome" => outcome).increment(1);
    histogram!("px_feed_negotiation_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}

/// Update the distinct key count.
#[allow(clippy::cast_precision_loss)]
pub fn set_snapshot_keys(count: usize) {
    gauge!("px_feed_snapshot_keys").set(count as f64);
}

/// Record the gap since the previous accepted frame.
pub fn record_interarrival(gap: Duration) {
    histogram!("px_feed_interarrival_seconds").record(gap.as_secs_f64());
}

/// `SessionMetricsPort` backed by the global `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl SessionMetricsPort for PrometheusMetrics {
    fn negotiation_finished(&self, outcome: &'static str, elapsed: Duration) {
        record_negotiation(outcome, elapsed);
    }

    fn frame_accepted(&self, keys: usize, gap: Option<Duration>) {
        record_message_received();
        set_snapshot_keys(keys);
        if let Some(gap) = gap {
            record_interarrival(gap);
        }
    }

    fn frame_rejected(&self, reason: &'static str) {
        record_message_rejected(reason);
    }
}
