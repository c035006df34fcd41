//! Negotiation Observer Port (Driver Port)
//!
//! The single notification interface through which lifecycle events leave
//! the negotiation engine.

use tokio::sync::mpsc;

use crate::domain::negotiation::NegotiationEvent;

/// Receives negotiation lifecycle events.
///
/// Called synchronously from substrate callbacks; implementations must not
/// block.
pub trait NegotiationObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: NegotiationEvent);
}

impl NegotiationObserver for mpsc::UnboundedSender<NegotiationEvent> {
    fn on_event(&self, event: NegotiationEvent) {
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::negotiation::GatheringState;

    #[test]
    fn channel_observer_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.on_event(NegotiationEvent::GatheringChanged(GatheringState::New));
        assert_eq!(
            rx.try_recv().unwrap(),
            NegotiationEvent::GatheringChanged(GatheringState::New)
        );
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel::<NegotiationEvent>();
        drop(rx);
        tx.on_event(NegotiationEvent::OfferObserved("v=0".to_string()));
    }
}
