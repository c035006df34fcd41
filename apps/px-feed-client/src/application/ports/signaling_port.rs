//! Signaling Port (Driven Port)
//!
//! One request/response exchange that trades the finalized local offer for
//! the remote answer.

use async_trait::async_trait;

use crate::domain::negotiation::SessionDescription;

/// Signaling exchange errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalingError {
    /// Network failure, non-success status, or a body that is not JSON.
    #[error("signaling transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// JSON body without the required `sdp`/`type` fields.
    #[error("malformed answer: {message}")]
    MalformedAnswer {
        /// Error details.
        message: String,
    },
}

/// Port for the offer/answer exchange.
#[async_trait]
pub trait SignalingPort: Send + Sync {
    /// Send `offer` and return the remote description from the response.
    async fn exchange(
        &self,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError>;
}
