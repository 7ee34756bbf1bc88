//! OHLCV candle representation and series helpers.
//!
//! Series invariant: sorted ascending by `ts_ms`, no duplicate timestamps.
//! [`merge_candles`] establishes the invariant regardless of input order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fixed-duration interval of trade data. `ts_ms` is the candle open time
/// in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Open time of the last fully closed candle at or before `at_ms`.
///
/// A candle opening exactly at `at_ms` is still forming, so the grid point is
/// taken from `at_ms - 1`.
pub fn last_closed_ts(at_ms: i64, frame_ms: i64) -> i64 {
    (at_ms - 1).div_euclid(frame_ms) * frame_ms
}

/// Merge two candle sets by timestamp; `b` wins on collision. The ordered map
/// guarantees the sorted/unique invariant independent of insertion order.
pub fn merge_candles(a: Vec<Candle>, b: Vec<Candle>) -> Vec<Candle> {
    let mut by_ts: BTreeMap<i64, Candle> = BTreeMap::new();
    for c in a.into_iter().chain(b) {
        by_ts.insert(c.ts_ms, c);
    }
    by_ts.into_values().collect()
}

/// Index of the candle opening exactly at `ts_ms`, if present.
pub fn index_of_ts(candles: &[Candle], ts_ms: i64) -> Option<usize> {
    candles.iter().position(|c| c.ts_ms == ts_ms)
}

/// Latest candle at or before `ts_ms`. Requires the series invariant.
pub fn closest_at_or_before(candles: &[Candle], ts_ms: i64) -> Option<&Candle> {
    candles.iter().rev().find(|c| c.ts_ms <= ts_ms)
}
