//! Application Services
//!
//! - `NegotiationEngine`: one offer/answer attempt over a peer connection
//! - `FeedSession`: runs negotiation, then feeds channel frames to the reducer

mod negotiation;
mod session;

pub use negotiation::{ConnectionHandle, NegotiationEngine, NegotiationError};
pub use session::{
    AppliedTick, FeedSession, ObservedNegotiation, SessionError, SessionState, SessionStore,
    SessionSummary, StopReason,
};
