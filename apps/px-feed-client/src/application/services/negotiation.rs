//! Negotiation Engine
//!
//! Drives one offer/answer attempt over a [`PeerConnectionPort`]:
//!
//! 1. create the local offer
//! 2. apply it as the local description
//! 3. wait for ICE gathering to complete
//! 4. report the finalized offer
//! 5. exchange it over the [`SignalingPort`]
//! 6. report the answer
//! 7. apply the answer as the remote description
//!
//! Every failure is fatal for the attempt. There is no retry and no deadline.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::application::ports::{
    DataChannelHandle, ListenerId, NegotiationObserver, PeerConnectionPort, SignalingError,
    SignalingPort, TransportError, TransportStateChange,
};
use crate::domain::negotiation::{
    GatheringState, IceConnectionState, NegotiationEvent, NegotiationStage, SessionDescription,
    SignalingState,
};

// =============================================================================
// Errors
// =============================================================================

/// Negotiation failures, tagged by the step that failed.
#[derive(Debug, Clone, Error)]
pub enum NegotiationError {
    /// A local or remote description was rejected.
    #[error("description error at {stage}: {message}")]
    Description {
        /// Failing step.
        stage: NegotiationStage,
        /// Error details.
        message: String,
    },

    /// Network failure, non-success status or undecodable body.
    #[error("signaling transport error: {message}")]
    SignalingTransport {
        /// Error details.
        message: String,
    },

    /// Response body lacked the required fields.
    #[error("malformed answer: {message}")]
    MalformedAnswer {
        /// Error details.
        message: String,
    },

    /// The connection went away while waiting for gathering.
    #[error("connection dropped before ICE gathering completed")]
    GatheringAborted,
}

impl NegotiationError {
    fn description(stage: NegotiationStage, err: &TransportError) -> Self {
        Self::Description {
            stage,
            message: err.to_string(),
        }
    }

    /// Step the attempt failed at.
    #[must_use]
    pub const fn stage(&self) -> NegotiationStage {
        match self {
            Self::Description { stage, .. } => *stage,
            Self::SignalingTransport { .. } | Self::MalformedAnswer { .. } => {
                NegotiationStage::Signaling
            }
            Self::GatheringAborted => NegotiationStage::Gathering,
        }
    }

    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Description { .. } => "description_error",
            Self::SignalingTransport { .. } => "signaling_transport_error",
            Self::MalformedAnswer { .. } => "malformed_answer",
            Self::GatheringAborted => "gathering_aborted",
        }
    }
}

impl From<SignalingError> for NegotiationError {
    fn from(err: SignalingError) -> Self {
        match err {
            SignalingError::Transport { message } => Self::SignalingTransport { message },
            SignalingError::MalformedAnswer { message } => Self::MalformedAnswer { message },
        }
    }
}

// =============================================================================
// Connection Handle
// =============================================================================

/// One peer connection attempt with its observer listener attached.
pub struct ConnectionHandle {
    transport: Arc<dyn PeerConnectionPort>,
    listener: ListenerId,
}

impl ConnectionHandle {
    /// Underlying transport.
    #[must_use]
    pub fn transport(&self) -> &dyn PeerConnectionPort {
        self.transport.as_ref()
    }

    /// Current gathering state.
    #[must_use]
    pub fn gathering_state(&self) -> GatheringState {
        self.transport.gathering_state()
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> IceConnectionState {
        self.transport.connection_state()
    }

    /// Current signaling state.
    #[must_use]
    pub fn signaling_state(&self) -> SignalingState {
        self.transport.signaling_state()
    }

    /// Current local description.
    pub async fn local_description(&self) -> Option<SessionDescription> {
        self.transport.local_description().await
    }

    /// Current remote description.
    pub async fn remote_description(&self) -> Option<SessionDescription> {
        self.transport.remote_description().await
    }

    /// Close the connection. Closing transitions are still reported to the
    /// observer; the listener is detached afterwards.
    ///
    /// # Errors
    ///
    /// Returns the substrate's error if closing fails.
    pub async fn close(&self) -> Result<(), TransportError> {
        let result = self.transport.close().await;
        self.transport.remove_state_listener(self.listener);
        result
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("gathering", &self.gathering_state())
            .field("connection", &self.connection_state())
            .field("signaling", &self.signaling_state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Runs negotiation attempts and reports their lifecycle to one observer.
#[derive(Clone)]
pub struct NegotiationEngine {
    observer: Arc<dyn NegotiationObserver>,
}

impl NegotiationEngine {
    /// Create an engine reporting to `observer`.
    #[must_use]
    pub fn new(observer: Arc<dyn NegotiationObserver>) -> Self {
        Self { observer }
    }

    /// Attach state listeners to `transport` and report the initial states.
    ///
    /// Every later gathering, connection and signaling transition is
    /// forwarded to the observer.
    pub fn create_connection(&self, transport: Arc<dyn PeerConnectionPort>) -> ConnectionHandle {
        let observer = Arc::clone(&self.observer);
        let listener = transport.add_state_listener(Arc::new(move |change: TransportStateChange| {
            if let TransportStateChange::Signaling(state) = change
                && !state.is_expected_for_offerer()
            {
                tracing::warn!(state = %state, "unexpected signaling state");
            }
            observer.on_event(change.into());
        }));

        self.observer
            .on_event(NegotiationEvent::GatheringChanged(transport.gathering_state()));
        self.observer
            .on_event(NegotiationEvent::ConnectionChanged(transport.connection_state()));
        self.observer
            .on_event(NegotiationEvent::SignalingChanged(transport.signaling_state()));

        ConnectionHandle {
            transport,
            listener,
        }
    }

    /// Create the ordered, reliable price channel.
    ///
    /// Must be called before [`negotiate`](Self::negotiate) so the channel is
    /// part of the offer.
    ///
    /// # Errors
    ///
    /// Returns the substrate's error if the channel cannot be created.
    pub async fn open_data_channel(
        &self,
        handle: &ConnectionHandle,
        label: &str,
    ) -> Result<DataChannelHandle, TransportError> {
        let channel = handle.transport().create_data_channel(label).await?;
        tracing::debug!(label, "data channel created");
        Ok(channel)
    }

    /// Run one offer/answer exchange to completion.
    ///
    /// Resolves with the applied remote description.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError`] tagged with the failing step. Nothing is
    /// retried.
    pub async fn negotiate(
        &self,
        handle: &ConnectionHandle,
        signaling: &dyn SignalingPort,
    ) -> Result<SessionDescription, NegotiationError> {
        let transport = handle.transport();

        let offer = transport
            .create_offer()
            .await
            .map_err(|e| NegotiationError::description(NegotiationStage::LocalDescription, &e))?;
        transport
            .set_local_description(offer)
            .await
            .map_err(|e| NegotiationError::description(NegotiationStage::LocalDescription, &e))?;
        tracing::debug!("local description applied, waiting for ICE gathering");

        wait_for_gathering(transport).await?;

        let local = transport
            .local_description()
            .await
            .ok_or_else(|| NegotiationError::Description {
                stage: NegotiationStage::Gathering,
                message: "no local description after gathering".to_string(),
            })?;
        self.observer
            .on_event(NegotiationEvent::OfferObserved(local.sdp.clone()));
        tracing::info!(sdp_len = local.sdp.len(), "ICE gathering complete, sending offer");

        let answer = signaling.exchange(&local).await?;
        self.observer
            .on_event(NegotiationEvent::AnswerObserved(answer.sdp.clone()));
        tracing::debug!(sdp_type = %answer.sdp_type, "answer received");

        transport
            .set_remote_description(answer.clone())
            .await
            .map_err(|e| NegotiationError::description(NegotiationStage::RemoteDescription, &e))?;
        tracing::info!("remote description applied");

        Ok(answer)
    }
}

impl std::fmt::Debug for NegotiationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiationEngine").finish_non_exhaustive()
    }
}

/// Resolve once gathering is `complete`.
///
/// The completion listener is registered before the state is re-checked, so a
/// transition landing between the two cannot be missed.
async fn wait_for_gathering(transport: &dyn PeerConnectionPort) -> Result<(), NegotiationError> {
    let (tx, rx) = oneshot::channel::<()>();
    let tx = Mutex::new(Some(tx));
    let listener = transport.add_state_listener(Arc::new(move |change: TransportStateChange| {
        if change == TransportStateChange::Gathering(GatheringState::Complete)
            && let Some(tx) = tx.lock().take()
        {
            let _ = tx.send(());
        }
    }));

    if transport.gathering_state() == GatheringState::Complete {
        transport.remove_state_listener(listener);
        return Ok(());
    }

    let outcome = rx.await;
    transport.remove_state_listener(listener);
    outcome.map_err(|_| NegotiationError::GatheringAborted)
}
