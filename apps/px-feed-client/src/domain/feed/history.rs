//! Bounded arrival history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of retained update records.
pub const DEFAULT_HISTORY_LEN: usize = 10;

/// One accepted frame and the wall-clock millisecond it was processed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Unix epoch milliseconds, non-decreasing across the history.
    pub epoch: i64,
    /// Original frame text.
    pub raw: String,
}

/// FIFO of the most recent [`UpdateRecord`]s, oldest first.
///
/// Pushing appends at the back and then evicts from the front until at most
/// `capacity` records remain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedHistory {
    records: VecDeque<UpdateRecord>,
    capacity: usize,
}

impl BoundedHistory {
    /// Create an empty history holding at most `capacity` records.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a record, then trim the oldest entries.
    ///
    /// The stored epoch is clamped to the newest existing epoch so that a
    /// wall clock stepping backwards cannot break ordering.
    pub fn push(&mut self, epoch: i64, raw: impl Into<String>) {
        let epoch = self.last_epoch().map_or(epoch, |last| epoch.max(last));
        self.records.push_back(UpdateRecord {
            epoch,
            raw: raw.into(),
        });
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Maximum retained records.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record has been retained yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Epoch of the newest record.
    #[must_use]
    pub fn last_epoch(&self) -> Option<i64> {
        self.records.back().map(|r| r.epoch)
    }

    /// Records oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &UpdateRecord> + ExactSizeIterator {
        self.records.iter()
    }

    /// Raw frame texts oldest to newest.
    #[must_use]
    pub fn raw_texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.raw.as_str()).collect()
    }
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut history = BoundedHistory::new(2);
        history.push(1, "a");
        history.push(2, "b");
        history.push(3, "c");

        assert_eq!(history.len(), 2);
        assert_eq!(history.raw_texts(), vec!["b", "c"]);
    }

    #[test]
    fn clamps_backwards_clock() {
        let mut history = BoundedHistory::new(4);
        history.push(1_000, "a");
        history.push(900, "b");

        let epochs: Vec<i64> = history.iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, vec![1_000, 1_000]);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut history = BoundedHistory::new(0);
        history.push(1, "a");
        history.push(2, "b");

        assert_eq!(history.capacity(), 1);
        assert_eq!(history.raw_texts(), vec!["b"]);
    }

    #[test]
    fn default_capacity() {
        let history = BoundedHistory::default();
        assert_eq!(history.capacity(), DEFAULT_HISTORY_LEN);
        assert!(history.is_empty());
        assert_eq!(history.last_epoch(), None);
    }
}
