//! Display-side projection of the feed state.
//!
//! Nothing here is stored; rows are recomputed from the history on demand.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use super::history::BoundedHistory;
use super::state::FeedState;

/// Placeholder for values that are not known yet.
pub const UNAVAILABLE: &str = "(Unavailable)";

/// One displayed history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Unix epoch milliseconds of the record.
    pub epoch: i64,
    /// Original frame text.
    pub raw: String,
    /// Milliseconds since the next-older record, if any.
    pub gap_ms: Option<i64>,
}

impl HistoryRow {
    /// Gap to the next-older record in seconds with millisecond precision.
    #[must_use]
    pub fn gap_secs(&self) -> Option<String> {
        self.gap_ms.map(format_gap)
    }

    /// RFC 3339 rendering of the record time.
    #[must_use]
    pub fn timestamp(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.epoch).map_or_else(
            || UNAVAILABLE.to_string(),
            |t| t.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

impl fmt::Display for HistoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.gap_secs() {
            Some(gap) => write!(f, "{}  {}  (+{gap}s)", self.timestamp(), self.raw),
            None => write!(f, "{}  {}", self.timestamp(), self.raw),
        }
    }
}

/// Reverse-chronological rows with inter-arrival gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryView {
    /// Rows newest first.
    pub rows: Vec<HistoryRow>,
}

impl HistoryView {
    /// Build the view for a history.
    #[must_use]
    pub fn from_history(history: &BoundedHistory) -> Self {
        let records: Vec<_> = history.iter().collect();
        let rows = records
            .iter()
            .enumerate()
            .rev()
            .map(|(i, record)| HistoryRow {
                epoch: record.epoch,
                raw: record.raw.clone(),
                gap_ms: i.checked_sub(1).map(|prev| record.epoch - records[prev].epoch),
            })
            .collect();
        Self { rows }
    }

    /// Render one line per key followed by the history rows.
    #[must_use]
    pub fn render(state: &FeedState) -> String {
        let mut out = String::new();
        if state.snapshot.is_empty() {
            out.push_str("current: ");
            out.push_str(UNAVAILABLE);
            out.push('\n');
        }
        for (key, value) in state.snapshot.iter() {
            out.push_str(&format!("current {key}: {value}\n"));
        }
        for row in Self::from_history(&state.history).rows {
            out.push_str(&format!("  {row}\n"));
        }
        out
    }
}

impl From<&BoundedHistory> for HistoryView {
    fn from(history: &BoundedHistory) -> Self {
        Self::from_history(history)
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_gap(gap_ms: i64) -> String {
    format!("{:.3}", gap_ms as f64 / 1_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_newest_first_with_gaps() {
        let mut history = BoundedHistory::new(5);
        history.push(1_000, "AAPL 100");
        history.push(1_250, "AAPL 101");
        history.push(3_001, "MSFT 200");

        let view = HistoryView::from(&history);
        let raws: Vec<&str> = view.rows.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(raws, vec!["MSFT 200", "AAPL 101", "AAPL 100"]);

        let gaps: Vec<Option<String>> = view.rows.iter().map(HistoryRow::gap_secs).collect();
        assert_eq!(
            gaps,
            vec![Some("1.751".to_string()), Some("0.250".to_string()), None]
        );
    }

    #[test]
    fn empty_history_has_no_rows() {
        let view = HistoryView::from_history(&BoundedHistory::new(3));
        assert!(view.rows.is_empty());
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let row = HistoryRow {
            epoch: 0,
            raw: "X 1".to_string(),
            gap_ms: None,
        };
        assert_eq!(row.timestamp(), "1970-01-01T00:00:00.000Z");
        assert_eq!(row.to_string(), "1970-01-01T00:00:00.000Z  X 1");
    }

    #[test]
    fn render_shows_placeholder_before_first_tick() {
        let rendered = HistoryView::render(&FeedState::new(3));
        assert!(rendered.contains(UNAVAILABLE));
    }

    #[test]
    fn render_lists_prices_and_rows() {
        let state = FeedState::new(3).reduce("NQ 18250.5", 1_000).0;
        let rendered = HistoryView::render(&state);
        assert!(rendered.contains("current NQ: 18250.5"));
        assert!(rendered.contains("NQ 18250.5"));
    }
}
