//! Feed Session Driver
//!
//! Composes the negotiation engine with the feed reducer. The driver owns an
//! explicit [`SessionStore`]: the latest negotiation observations plus the
//! current [`FeedState`], each replaced wholesale on every update.
//!
//! Channel events are consumed by a single task, so the reducer sees frames
//! in channel delivery order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::negotiation::{ConnectionHandle, NegotiationEngine, NegotiationError};
use crate::application::ports::{
    ChannelEvent, DataChannelHandle, NegotiationObserver, PeerConnectionPort,
    SessionMetricsPort, SignalingPort, TransportError, TransportStateChange,
};
use crate::domain::feed::{
    FeedState, HistoryView, MalformedMessageError, PriceTick, SecurityKey, UNAVAILABLE,
};
use crate::domain::negotiation::{
    GatheringState, IceConnectionState, NegotiationEvent, SignalingState,
};

// =============================================================================
// Errors
// =============================================================================

/// Session driver errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Negotiation failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// Transport failed outside negotiation.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Session State
// =============================================================================

/// Latest value of every negotiation observable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedNegotiation {
    /// Latest gathering state.
    pub gathering: GatheringState,
    /// Latest connection state.
    pub connection: IceConnectionState,
    /// Latest signaling state.
    pub signaling: SignalingState,
    /// Finalized offer SDP, once observed.
    pub offer_sdp: Option<String>,
    /// Answer SDP, once observed.
    pub answer_sdp: Option<String>,
}

impl ObservedNegotiation {
    /// Next observation after `event`.
    #[must_use]
    pub fn observe(self, event: NegotiationEvent) -> Self {
        match event {
            NegotiationEvent::GatheringChanged(gathering) => Self { gathering, ..self },
            NegotiationEvent::ConnectionChanged(connection) => Self { connection, ..self },
            NegotiationEvent::SignalingChanged(signaling) => Self { signaling, ..self },
            NegotiationEvent::OfferObserved(sdp) => Self {
                offer_sdp: Some(sdp),
                ..self
            },
            NegotiationEvent::AnswerObserved(sdp) => Self {
                answer_sdp: Some(sdp),
                ..self
            },
        }
    }

    /// Offer SDP or the placeholder.
    #[must_use]
    pub fn offer_text(&self) -> &str {
        self.offer_sdp.as_deref().unwrap_or(UNAVAILABLE)
    }

    /// Answer SDP or the placeholder.
    #[must_use]
    pub fn answer_text(&self) -> &str {
        self.answer_sdp.as_deref().unwrap_or(UNAVAILABLE)
    }
}

/// Everything the driver knows about the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Negotiation observations.
    pub negotiation: ObservedNegotiation,
    /// Reducer state.
    pub feed: FeedState,
}

/// Result of applying one accepted tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTick {
    /// Key that was updated.
    pub key: SecurityKey,
    /// New value for the key.
    pub value: Decimal,
    /// Distinct keys after the update.
    pub keys: usize,
    /// Milliseconds since the previous accepted tick.
    pub gap_ms: Option<i64>,
}

/// Shared, replace-on-write session state.
#[derive(Debug)]
pub struct SessionStore {
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Empty store retaining `history_len` updates.
    #[must_use]
    pub fn new(history_len: usize) -> Self {
        Self {
            state: RwLock::new(SessionState {
                negotiation: ObservedNegotiation::default(),
                feed: FeedState::new(history_len),
            }),
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Fold one accepted tick into the feed state.
    pub fn apply_tick(&self, tick: PriceTick, epoch: i64) -> AppliedTick {
        let key = tick.key.clone();
        let value = tick.value;

        let mut state = self.state.write();
        let feed = std::mem::take(&mut state.feed);
        let previous = feed.history.last_epoch();
        let next = feed.apply(tick, epoch);
        let applied = AppliedTick {
            key,
            value,
            keys: next.snapshot.len(),
            gap_ms: previous.zip(next.history.last_epoch()).map(|(p, n)| n - p),
        };
        state.feed = next;
        applied
    }

    /// Render the current feed view.
    #[must_use]
    pub fn render(&self) -> String {
        HistoryView::render(&self.state.read().feed)
    }
}

impl NegotiationObserver for SessionStore {
    fn on_event(&self, event: NegotiationEvent) {
        match &event {
            NegotiationEvent::GatheringChanged(s) => tracing::info!(state = %s, "ICE gathering"),
            NegotiationEvent::ConnectionChanged(s) => {
                tracing::info!(state = %s, "ICE connection");
            }
            NegotiationEvent::SignalingChanged(s) => tracing::info!(state = %s, "signaling"),
            NegotiationEvent::OfferObserved(sdp) | NegotiationEvent::AnswerObserved(sdp) => {
                tracing::debug!(kind = event.kind(), sdp = %sdp, "session description");
            }
        }

        let mut state = self.state.write();
        let previous = std::mem::take(&mut state.negotiation);
        state.negotiation = previous.observe(event);
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Why the consume loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The data channel closed.
    ChannelClosed,
    /// Shutdown was requested.
    Shutdown,
    /// The ICE connection failed or closed underneath the channel.
    ConnectionLost,
}

/// Totals for a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames applied to the feed.
    pub accepted: u64,
    /// Frames dropped as malformed.
    pub rejected: u64,
    /// Distinct keys seen.
    pub keys: usize,
    /// Why consumption stopped.
    pub stop_reason: StopReason,
}

/// Runs one negotiation attempt and then consumes the price channel.
pub struct FeedSession {
    engine: NegotiationEngine,
    store: Arc<SessionStore>,
    signaling: Arc<dyn SignalingPort>,
    metrics: Arc<dyn SessionMetricsPort>,
    channel_label: String,
}

impl FeedSession {
    /// Create a session exchanging offers over `signaling` and reporting to
    /// `metrics`.
    #[must_use]
    pub fn new(
        signaling: Arc<dyn SignalingPort>,
        metrics: Arc<dyn SessionMetricsPort>,
        channel_label: impl Into<String>,
        history_len: usize,
    ) -> Self {
        let store = Arc::new(SessionStore::new(history_len));
        Self {
            engine: NegotiationEngine::new(Arc::clone(&store) as Arc<dyn NegotiationObserver>),
            store,
            signaling,
            metrics,
            channel_label: channel_label.into(),
        }
    }

    /// Session state store.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Negotiate over `transport`, then feed channel frames to the reducer
    /// until the channel closes, the ICE connection fails or closes, or
    /// `shutdown` fires. The connection is closed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the channel cannot be created or
    /// negotiation fails.
    pub async fn run(
        &self,
        transport: Arc<dyn PeerConnectionPort>,
        shutdown: CancellationToken,
    ) -> Result<SessionSummary, SessionError> {
        let handle = self.engine.create_connection(transport);

        let mut channel = match self
            .engine
            .open_data_channel(&handle, &self.channel_label)
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                close_quietly(&handle).await;
                return Err(e.into());
            }
        };

        let started = Instant::now();
        let outcome = self.engine.negotiate(&handle, self.signaling.as_ref()).await;
        let elapsed = started.elapsed();
        match &outcome {
            Ok(_) => self.metrics.negotiation_finished("success", elapsed),
            Err(e) => self.metrics.negotiation_finished(e.kind(), elapsed),
        }
        if let Err(e) = outcome {
            close_quietly(&handle).await;
            return Err(e.into());
        }
        tracing::info!(elapsed_secs = elapsed.as_secs_f64(), "negotiation complete");

        let lost = CancellationToken::new();
        let watcher = {
            let lost = lost.clone();
            handle
                .transport()
                .add_state_listener(Arc::new(move |change: TransportStateChange| {
                    if let TransportStateChange::Connection(state) = change
                        && state.is_terminal()
                    {
                        lost.cancel();
                    }
                }))
        };
        if handle.connection_state().is_terminal() {
            lost.cancel();
        }

        let summary = self.consume(&mut channel, &shutdown, &lost).await;
        handle.transport().remove_state_listener(watcher);
        handle.close().await?;
        tracing::info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            keys = summary.keys,
            stop_reason = ?summary.stop_reason,
            "session finished"
        );
        Ok(summary)
    }

    async fn consume(
        &self,
        channel: &mut DataChannelHandle,
        shutdown: &CancellationToken,
        lost: &CancellationToken,
    ) -> SessionSummary {
        let mut accepted = 0_u64;
        let mut rejected = 0_u64;

        let stop_reason = loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => break StopReason::Shutdown,
                () = lost.cancelled() => {
                    tracing::warn!(
                        label = channel.label(),
                        channel_state = channel.state().as_str(),
                        "ICE connection lost"
                    );
                    break StopReason::ConnectionLost;
                }
                event = channel.next_event() => event,
            };

            let parsed = match event {
                Some(ChannelEvent::Opened) => {
                    tracing::info!(label = channel.label(), "data channel open");
                    continue;
                }
                Some(ChannelEvent::Message(text)) => PriceTick::parse(&text),
                Some(ChannelEvent::Binary(data)) => PriceTick::parse_bytes(&data),
                Some(ChannelEvent::Closed) | None => {
                    tracing::info!(
                        label = channel.label(),
                        channel_state = channel.state().as_str(),
                        "data channel closed"
                    );
                    break StopReason::ChannelClosed;
                }
            };

            match parsed {
                Ok(tick) => {
                    self.ingest(tick);
                    accepted += 1;
                }
                Err(e) => {
                    self.reject(&e);
                    rejected += 1;
                }
            }
        };

        SessionSummary {
            accepted,
            rejected,
            keys: self.store.snapshot().feed.snapshot.len(),
            stop_reason,
        }
    }

    fn ingest(&self, tick: PriceTick) {
        let epoch = chrono::Utc::now().timestamp_millis();
        let applied = self.store.apply_tick(tick, epoch);

        let gap = applied
            .gap_ms
            .and_then(|ms| u64::try_from(ms).ok())
            .map(Duration::from_millis);
        self.metrics.frame_accepted(applied.keys, gap);

        tracing::info!(key = %applied.key, value = %applied.value, "price update");
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(view = %self.store.render(), "feed view");
        }
    }

    fn reject(&self, err: &MalformedMessageError) {
        self.metrics.frame_rejected(err.reason());
        tracing::warn!(reason = err.reason(), error = %err, "dropping malformed frame");
    }
}

impl std::fmt::Debug for FeedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSession")
            .field("channel_label", &self.channel_label)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

async fn close_quietly(handle: &ConnectionHandle) {
    if let Err(e) = handle.close().await {
        tracing::warn!(error = %e, "failed to close peer connection");
    }
}
