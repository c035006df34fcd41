//! Snapshot plus history pair and the reducer that advances it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::history::BoundedHistory;
use super::{PriceTick, SecurityKey};

/// Latest value per security key. Keys are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceSnapshot {
    prices: BTreeMap<SecurityKey, Decimal>,
}

impl PriceSnapshot {
    /// Insert or overwrite the value for `key`.
    pub fn upsert(&mut self, key: SecurityKey, value: Decimal) {
        self.prices.insert(key, value);
    }

    /// Latest value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.prices.get(key).copied()
    }

    /// Number of distinct keys seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether no key has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &SecurityKey> {
        self.prices.keys()
    }

    /// `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&SecurityKey, Decimal)> {
        self.prices.iter().map(|(k, v)| (k, *v))
    }
}

/// The `(PriceSnapshot, BoundedHistory)` pair the reducer advances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    /// Latest value per key.
    pub snapshot: PriceSnapshot,
    /// Recent accepted frames, oldest first.
    pub history: BoundedHistory,
}

impl FeedState {
    /// Empty state retaining at most `history_len` records.
    #[must_use]
    pub fn new(history_len: usize) -> Self {
        Self {
            snapshot: PriceSnapshot::default(),
            history: BoundedHistory::new(history_len),
        }
    }

    /// Produce the next state from one accepted tick processed at `epoch`.
    #[must_use]
    pub fn apply(mut self, tick: PriceTick, epoch: i64) -> Self {
        self.snapshot.upsert(tick.key, tick.value);
        self.history.push(epoch, tick.raw);
        self
    }

    /// Parse `raw` and apply it, returning the state unchanged on a
    /// malformed frame alongside the rejection.
    #[must_use]
    pub fn reduce(self, raw: &str, epoch: i64) -> (Self, Option<super::MalformedMessageError>) {
        match PriceTick::parse(raw) {
            Ok(tick) => (self.apply(tick, epoch), None),
            Err(err) => (self, Some(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(history_len: usize, frames: &[&str]) -> FeedState {
        frames
            .iter()
            .enumerate()
            .fold(FeedState::new(history_len), |state, (i, raw)| {
                state.reduce(raw, i as i64 * 10).0
            })
    }

    #[test]
    fn four_frames_with_capacity_three() {
        let state = run(3, &["AAPL 100", "MSFT 200", "AAPL 101", "GOOG 300"]);

        assert_eq!(state.snapshot.len(), 3);
        assert_eq!(state.snapshot.get("AAPL"), Some(Decimal::from(101)));
        assert_eq!(state.snapshot.get("MSFT"), Some(Decimal::from(200)));
        assert_eq!(state.snapshot.get("GOOG"), Some(Decimal::from(300)));
        assert_eq!(
            state.history.raw_texts(),
            vec!["MSFT 200", "AAPL 101", "GOOG 300"]
        );
    }

    #[test]
    fn repeated_frame_appends_twice() {
        let state = run(10, &["AAPL 100", "AAPL 100"]);

        assert_eq!(state.snapshot.len(), 1);
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn malformed_frame_leaves_state_untouched() {
        let before = run(3, &["AAPL 100"]);
        let (after, rejected) = before.clone().reduce("garbage", 99);

        assert_eq!(after, before);
        assert_eq!(rejected.map(|e| e.reason()), Some("missing_separator"));
    }

    #[test]
    fn snapshot_iterates_in_key_order() {
        let state = run(5, &["MSFT 2", "AAPL 1"]);
        let keys: Vec<&str> = state.snapshot.keys().map(SecurityKey::as_str).collect();
        assert_eq!(keys, vec!["AAPL", "MSFT"]);
    }
}
