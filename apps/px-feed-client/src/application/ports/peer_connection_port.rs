//! Peer Connection Port (Driven Port)
//!
//! Interface to the transport substrate that owns ICE, DTLS and SCTP. The
//! negotiation engine only drives descriptions through this port and observes
//! the substrate's state transitions; it never inspects candidates directly.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::negotiation::{
    GatheringState, IceConnectionState, NegotiationEvent, SessionDescription, SignalingState,
};

// =============================================================================
// Errors
// =============================================================================

/// Transport substrate errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Substrate API call failed.
    #[error("transport api error: {message}")]
    Api {
        /// Error details.
        message: String,
    },

    /// Description was rejected when applied.
    #[error("description rejected: {message}")]
    DescriptionRejected {
        /// Error details.
        message: String,
    },

    /// Description could not be converted for the substrate.
    #[error("invalid description: {message}")]
    InvalidDescription {
        /// Error details.
        message: String,
    },

    /// Data channel could not be created.
    #[error("data channel error: {message}")]
    DataChannel {
        /// Error details.
        message: String,
    },

    /// Connection already closed.
    #[error("peer connection is closed")]
    Closed,
}

// =============================================================================
// State Listeners
// =============================================================================

/// A state transition reported by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStateChange {
    /// Gathering state transition.
    Gathering(GatheringState),
    /// ICE connection state transition.
    Connection(IceConnectionState),
    /// Signaling state transition.
    Signaling(SignalingState),
}

impl From<TransportStateChange> for NegotiationEvent {
    fn from(change: TransportStateChange) -> Self {
        match change {
            TransportStateChange::Gathering(s) => Self::GatheringChanged(s),
            TransportStateChange::Connection(s) => Self::ConnectionChanged(s),
            TransportStateChange::Signaling(s) => Self::SignalingChanged(s),
        }
    }
}

/// Identifier returned when registering a listener.
pub type ListenerId = u64;

/// Callback invoked on every state transition.
pub type StateListener = Arc<dyn Fn(TransportStateChange) + Send + Sync>;

/// Registry of state listeners shared by port implementations.
///
/// Listeners are invoked outside the registry lock, so a listener may
/// register or remove listeners without deadlocking.
#[derive(Default)]
pub struct StateListeners {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, StateListener)>>,
}

impl StateListeners {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn add(&self, listener: StateListener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver a transition to every registered listener.
    pub fn emit(&self, change: TransportStateChange) {
        let snapshot: Vec<StateListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(change);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for StateListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateListeners")
            .field("registered", &self.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Data Channel
// =============================================================================

/// Data channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Created, not yet open.
    Connecting = 0,
    /// Open and delivering messages.
    Open = 1,
    /// Closed; no further messages.
    Closed = 2,
}

impl From<u8> for ChannelState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::Closed,
            _ => Self::Connecting,
        }
    }
}

impl ChannelState {
    /// Lifecycle name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Events delivered by a data channel, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Channel opened.
    Opened,
    /// Text frame.
    Message(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Channel closed.
    Closed,
}

/// Consumer side of an ordered, reliable data channel.
#[derive(Debug)]
pub struct DataChannelHandle {
    label: String,
    state: Arc<AtomicU8>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Producer side handed to the substrate's channel callbacks.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    state: Arc<AtomicU8>,
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl DataChannelHandle {
    /// Create a handle in the `connecting` state and its event sink.
    #[must_use]
    pub fn new(label: impl Into<String>) -> (Self, ChannelEventSink) {
        let state = Arc::new(AtomicU8::new(ChannelState::Connecting as u8));
        let (tx, events) = mpsc::unbounded_channel();
        let sink = ChannelEventSink {
            state: Arc::clone(&state),
            tx,
        };
        (
            Self {
                label: label.into(),
                state,
                events,
            },
            sink,
        )
    }

    /// Channel label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        ChannelState::from(self.state.load(Ordering::Acquire))
    }

    /// Next event, or `None` once every sink is gone.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }
}

impl ChannelEventSink {
    /// Mark the channel open. Ignored unless the channel is still
    /// connecting.
    pub fn opened(&self) {
        if self
            .state
            .compare_exchange(
                ChannelState::Connecting as u8,
                ChannelState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            let _ = self.tx.send(ChannelEvent::Opened);
        }
    }

    /// Forward a text frame.
    pub fn message(&self, text: String) {
        let _ = self.tx.send(ChannelEvent::Message(text));
    }

    /// Forward a binary frame.
    pub fn binary(&self, data: Vec<u8>) {
        let _ = self.tx.send(ChannelEvent::Binary(data));
    }

    /// Mark the channel closed.
    pub fn closed(&self) {
        let previous = self.state.swap(ChannelState::Closed as u8, Ordering::AcqRel);
        if ChannelState::from(previous) != ChannelState::Closed {
            let _ = self.tx.send(ChannelEvent::Closed);
        }
    }
}

// =============================================================================
// Port
// =============================================================================

/// Port for one peer connection.
///
/// State getters report the substrate's current state. Every transition is
/// delivered to registered listeners after the getter already reflects it.
#[async_trait]
pub trait PeerConnectionPort: Send + Sync {
    /// Current ICE gathering state.
    fn gathering_state(&self) -> GatheringState;

    /// Current ICE connection state.
    fn connection_state(&self) -> IceConnectionState;

    /// Current signaling state.
    fn signaling_state(&self) -> SignalingState;

    /// Register a state listener.
    fn add_state_listener(&self, listener: StateListener) -> ListenerId;

    /// Remove a state listener.
    fn remove_state_listener(&self, id: ListenerId);

    /// Create an ordered, reliable data channel.
    async fn create_data_channel(&self, label: &str) -> Result<DataChannelHandle, TransportError>;

    /// Create a local offer with default options.
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    /// Apply the local description; starts candidate gathering.
    async fn set_local_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    /// Current local description, including gathered candidates.
    async fn local_description(&self) -> Option<SessionDescription>;

    /// Apply the remote description.
    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError>;

    /// Current remote description.
    async fn remote_description(&self) -> Option<SessionDescription>;

    /// Close the connection and every channel on it.
    async fn close(&self) -> Result<(), TransportError>;
}
