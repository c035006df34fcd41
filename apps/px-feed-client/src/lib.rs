#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_possible_wrap,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value
    )
)]

//! Price Feed Client - WebRTC data channel consumer
//!
//! Negotiates a peer connection with a remote endpoint through a single HTTP
//! offer/answer exchange, opens one ordered data channel and folds the
//! `<key> <value>` price frames it carries into a snapshot plus bounded
//! history.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: pure types and the feed reducer
//!   - `feed`: price ticks, snapshot, bounded history, rendered view
//!   - `negotiation`: transport states, session descriptions, events
//!
//! - **Application**: services and ports
//!   - `ports`: peer connection, signaling, metrics and observer interfaces
//!   - `services`: negotiation engine and feed session driver
//!
//! - **Infrastructure**: adapters
//!   - `peer_connection`: webrtc-rs transport
//!   - `signaling`: reqwest signaling client
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//!  NegotiationEngine ── offer ──► HttpSignalingClient ── POST ──► endpoint
//!         ▲                                                          │
//!         └──────────────────────── answer ◄─────────────────────────┘
//!
//!  data channel ── "AAPL 101" ──► PriceTick::parse ──► FeedState::apply
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Feed reducer and negotiation vocabulary.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::feed::{
    BoundedHistory, FeedState, HistoryRow, HistoryView, MalformedMessageError, PriceSnapshot,
    PriceTick, SecurityKey, UpdateRecord,
};
pub use domain::negotiation::{
    GatheringState, IceConnectionState, NegotiationEvent, NegotiationStage, SdpType,
    SessionDescription, SignalingState,
};

// Ports
pub use application::ports::{
    ChannelEvent, ChannelState, DataChannelHandle, NegotiationObserver, PeerConnectionPort,
    SessionMetricsPort, SignalingError, SignalingPort, TransportError,
};

// Services
pub use application::services::{
    ConnectionHandle, FeedSession, NegotiationEngine, NegotiationError, SessionError,
    SessionState, SessionSummary, StopReason,
};

// Adapters
pub use infrastructure::config::{ClientConfig, ConfigError};
pub use infrastructure::metrics::{PrometheusMetrics, init_metrics};
pub use infrastructure::peer_connection::WebRtcPeerConnection;
pub use infrastructure::signaling::HttpSignalingClient;
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
