//! Application Ports (Driver and Driven)
//!
//! - **Driven**: `PeerConnectionPort` for the transport substrate,
//!   `SignalingPort` for the HTTP offer/answer exchange,
//!   `SessionMetricsPort` for session counters and timings
//! - **Driver**: `NegotiationObserver`, implemented by whoever consumes
//!   lifecycle events

mod negotiation_observer_port;
mod peer_connection_port;
mod session_metrics_port;
mod signaling_port;

pub use negotiation_observer_port::NegotiationObserver;
pub use peer_connection_port::{
    ChannelEvent, ChannelEventSink, ChannelState, DataChannelHandle, ListenerId,
    PeerConnectionPort, StateListener, StateListeners, TransportError, TransportStateChange,
};
pub use session_metrics_port::SessionMetricsPort;
pub use signaling_port::{SignalingError, SignalingPort};
