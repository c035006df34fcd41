//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the application ports plus process-level
//! concerns (configuration, metrics, telemetry).

/// Environment configuration.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// webrtc-rs peer connection adapter.
pub mod peer_connection;

/// HTTP signaling client.
pub mod signaling;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
