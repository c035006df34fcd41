//! Session Metrics Port (Driven Port)
//!
//! Counters and timings the feed session reports while it runs.

use std::time::Duration;

/// Port for recording session metrics.
pub trait SessionMetricsPort: Send + Sync {
    /// A negotiation attempt finished with `outcome` (`success` or an error
    /// kind) after `elapsed`.
    fn negotiation_finished(&self, outcome: &'static str, elapsed: Duration);

    /// A frame was applied; `keys` is the snapshot size afterwards and `gap`
    /// the time since the previous accepted frame.
    fn frame_accepted(&self, keys: usize, gap: Option<Duration>);

    /// A frame was dropped for `reason`.
    fn frame_rejected(&self, reason: &'static str);
}
