//! Property tests for the feed reducer
//!
//! Invariants that hold for any frame sequence:
//! - the snapshot holds the latest value per key and never loses a key
//! - history keeps exactly the last `N` accepted frames in arrival order
//! - the derived view is newest first with non-negative gaps

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use rust_decimal::Decimal;

use px_feed_client::{FeedState, HistoryView};

fn frame() -> impl Strategy<Value = (String, u32)> {
    ("[A-Z]{1,5}", 0u32..1_000_000)
}

fn fold(history_len: usize, frames: &[String]) -> FeedState {
    frames
        .iter()
        .enumerate()
        .fold(FeedState::new(history_len), |state, (i, raw)| {
            let (next, rejected) = state.reduce(raw, 1_000 + i64::try_from(i).unwrap());
            assert!(rejected.is_none(), "{raw:?} should parse");
            next
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Repeating a frame keeps the key set and appends two records.
    #[test]
    fn prop_repeated_frame_keeps_key_set(
        prefix in prop::collection::vec(frame(), 0..10),
        (key, value) in frame(),
    ) {
        let mut frames: Vec<String> = prefix.iter().map(|(k, v)| format!("{k} {v}")).collect();
        let raw = format!("{key} {value}");

        frames.push(raw.clone());
        let once = fold(64, &frames);
        frames.push(raw.clone());
        let twice = fold(64, &frames);

        let keys_once: Vec<_> = once.snapshot.keys().cloned().collect();
        let keys_twice: Vec<_> = twice.snapshot.keys().cloned().collect();
        prop_assert_eq!(keys_once, keys_twice);
        prop_assert_eq!(twice.snapshot.get(&key), Some(Decimal::from(value)));
        prop_assert_eq!(twice.history.len(), once.history.len() + 1);
        prop_assert_eq!(twice.history.raw_texts().last().copied(), Some(raw.as_str()));
    }

    /// Every key maps to the value of its most recent frame.
    #[test]
    fn prop_snapshot_holds_latest_value(frames in prop::collection::vec(frame(), 1..40)) {
        let raws: Vec<String> = frames.iter().map(|(k, v)| format!("{k} {v}")).collect();
        let state = fold(5, &raws);

        for (key, _) in &frames {
            let latest = frames.iter().rev().find(|(k, _)| k == key).map(|(_, v)| *v).unwrap();
            prop_assert_eq!(state.snapshot.get(key), Some(Decimal::from(latest)));
        }
    }

    /// History length is `min(M, N)` and holds the newest frames.
    #[test]
    fn prop_history_is_bounded(
        frames in prop::collection::vec(frame(), 0..40),
        history_len in 1usize..8,
    ) {
        let raws: Vec<String> = frames.iter().map(|(k, v)| format!("{k} {v}")).collect();
        let state = fold(history_len, &raws);

        let expected_len = raws.len().min(history_len);
        prop_assert_eq!(state.history.len(), expected_len);

        let tail: Vec<&str> = raws[raws.len() - expected_len..].iter().map(String::as_str).collect();
        prop_assert_eq!(state.history.raw_texts(), tail);
    }

    /// Distinct frames come back oldest to newest in delivery order.
    #[test]
    fn prop_history_preserves_order(count in 1usize..30, history_len in 1usize..12) {
        let raws: Vec<String> = (0..count).map(|i| format!("K{i} {i}")).collect();
        let state = fold(history_len, &raws);

        let skip = count.saturating_sub(history_len);
        let expected: Vec<&str> = raws.iter().skip(skip).map(String::as_str).collect();
        prop_assert_eq!(state.history.raw_texts(), expected);
    }

    /// Rows are newest first and gaps never go negative, even when the
    /// clock steps backwards.
    #[test]
    fn prop_view_gaps_are_non_negative(epochs in prop::collection::vec(0i64..10_000_000, 1..20)) {
        let state = epochs.iter().enumerate().fold(FeedState::new(8), |state, (i, epoch)| {
            state.reduce(&format!("K {i}"), *epoch).0
        });
        let view = HistoryView::from_history(&state.history);

        prop_assert_eq!(view.rows.len(), state.history.len());
        prop_assert_eq!(view.rows.last().unwrap().gap_ms, None);
        for row in &view.rows {
            if let Some(gap) = row.gap_ms {
                prop_assert!(gap >= 0);
            }
        }
        for pair in view.rows.windows(2) {
            prop_assert!(pair[0].epoch >= pair[1].epoch);
        }
    }
}

#[test]
fn test_four_frames_with_history_of_three() {
    let frames = ["AAPL 100", "MSFT 200", "AAPL 101", "GOOG 300"].map(String::from);
    let state = fold(3, &frames);

    assert_eq!(state.snapshot.len(), 3);
    assert_eq!(state.snapshot.get("AAPL"), Some(Decimal::from(101)));
    assert_eq!(state.snapshot.get("MSFT"), Some(Decimal::from(200)));
    assert_eq!(state.snapshot.get("GOOG"), Some(Decimal::from(300)));
    assert_eq!(
        state.history.raw_texts(),
        vec!["MSFT 200", "AAPL 101", "GOOG 300"]
    );

    let view = HistoryView::from_history(&state.history);
    let raws: Vec<&str> = view.rows.iter().map(|row| row.raw.as_str()).collect();
    assert_eq!(raws, vec!["GOOG 300", "AAPL 101", "MSFT 200"]);
    assert_eq!(view.rows[0].gap_secs().as_deref(), Some("0.001"));
}

#[test]
fn test_malformed_frames_do_not_touch_state() {
    let state = fold(3, &["AAPL 100".to_string()]);
    let before = state.clone();

    let (state, rejected) = state.reduce("AAPL", 5_000);
    assert!(rejected.is_some());
    let (state, rejected) = state.reduce("AAPL one", 6_000);
    assert!(rejected.is_some());

    assert_eq!(state, before);
}
