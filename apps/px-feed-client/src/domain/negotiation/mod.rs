//! Negotiation Vocabulary
//!
//! States reported by the transport substrate, the session description that
//! travels over the signaling exchange, and the lifecycle events surfaced to
//! whoever drives a connection attempt.
//!
//! The state enums mirror the W3C names (`have-local-offer`, `checking`, ...)
//! so that logs read the same as a browser's devtools.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Transport States
// =============================================================================

/// ICE candidate gathering state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatheringState {
    /// No gathering has started.
    #[default]
    New,
    /// Candidates are being discovered.
    Gathering,
    /// Gathering finished; the local description holds every candidate.
    Complete,
}

impl GatheringState {
    /// W3C name of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Gathering => "gathering",
            Self::Complete => "complete",
        }
    }
}

/// ICE connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IceConnectionState {
    /// Waiting for candidates.
    #[default]
    New,
    /// Checking candidate pairs.
    Checking,
    /// A usable pair was found.
    Connected,
    /// Checking finished with a usable pair.
    Completed,
    /// Connectivity was lost.
    Disconnected,
    /// No usable pair.
    Failed,
    /// Connection shut down.
    Closed,
}

impl IceConnectionState {
    /// W3C name of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Checking => "checking",
            Self::Connected => "connected",
            Self::Completed => "completed",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }

    /// Whether the state is terminal for this attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

/// Offer/answer signaling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingState {
    /// No exchange in progress.
    #[default]
    Stable,
    /// A local offer has been applied.
    HaveLocalOffer,
    /// A remote offer has been applied.
    HaveRemoteOffer,
    /// A local provisional answer has been applied.
    HaveLocalPranswer,
    /// A remote provisional answer has been applied.
    HaveRemotePranswer,
    /// Connection closed.
    Closed,
}

impl SignalingState {
    /// W3C name of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::HaveLocalOffer => "have-local-offer",
            Self::HaveRemoteOffer => "have-remote-offer",
            Self::HaveLocalPranswer => "have-local-pranswer",
            Self::HaveRemotePranswer => "have-remote-pranswer",
            Self::Closed => "closed",
        }
    }

    /// Whether an offer-initiating engine expects to see this state.
    ///
    /// Only `stable -> have-local-offer -> stable` is expected.
    #[must_use]
    pub const fn is_expected_for_offerer(&self) -> bool {
        matches!(self, Self::Stable | Self::HaveLocalOffer)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })+
    };
}

display_as_str!(GatheringState, IceConnectionState, SignalingState, SdpType, NegotiationStage);

// =============================================================================
// Session Description
// =============================================================================

/// Session description type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Offer.
    Offer,
    /// Provisional answer.
    Pranswer,
    /// Final answer.
    Answer,
    /// Rollback.
    Rollback,
}

impl SdpType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Pranswer => "pranswer",
            Self::Answer => "answer",
            Self::Rollback => "rollback",
        }
    }

    /// Parse a wire name, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "offer" => Some(Self::Offer),
            "pranswer" => Some(Self::Pranswer),
            "answer" => Some(Self::Answer),
            "rollback" => Some(Self::Rollback),
            _ => None,
        }
    }
}

/// A session description as exchanged with the signaling endpoint.
///
/// Serializes as `{"sdp": ..., "type": ...}`. The SDP text is opaque and is
/// never modified in transit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// SDP text.
    pub sdp: String,
    /// Description type.
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
}

impl SessionDescription {
    /// Create an offer description.
    #[must_use]
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: SdpType::Offer,
        }
    }

    /// Create an answer description.
    #[must_use]
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: SdpType::Answer,
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Step of a negotiation attempt, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NegotiationStage {
    /// Creating or applying the local offer.
    LocalDescription,
    /// Waiting for ICE gathering to complete.
    Gathering,
    /// HTTP offer/answer exchange.
    Signaling,
    /// Applying the remote answer.
    RemoteDescription,
}

impl NegotiationStage {
    /// Stage name as reported in errors and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LocalDescription => "local-description",
            Self::Gathering => "gathering",
            Self::Signaling => "signaling",
            Self::RemoteDescription => "remote-description",
        }
    }
}

/// Lifecycle notifications emitted during and after negotiation.
///
/// Each kind has "latest value" semantics; observers only need to keep the
/// most recent value per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationEvent {
    /// ICE gathering state changed (or initial state).
    GatheringChanged(GatheringState),
    /// ICE connection state changed (or initial state).
    ConnectionChanged(IceConnectionState),
    /// Signaling state changed (or initial state).
    SignalingChanged(SignalingState),
    /// Finalized local offer SDP, emitted once gathering completes.
    OfferObserved(String),
    /// Answer SDP received from the signaling endpoint.
    AnswerObserved(String),
}

impl NegotiationEvent {
    /// Short kind label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GatheringChanged(_) => "gathering",
            Self::ConnectionChanged(_) => "connection",
            Self::SignalingChanged(_) => "signaling",
            Self::OfferObserved(_) => "offer",
            Self::AnswerObserved(_) => "answer",
        }
    }
}
