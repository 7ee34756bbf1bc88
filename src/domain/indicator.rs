//! Pure indicator series math: RSI, SMA, and SMA-cross classification.
//!
//! RSI uses Wilder's smoothing for average gain/loss:
//! - seed average: simple mean of gains/losses over the first `period` deltas
//! - recurrence: `avg = (prev_avg * (period - 1) + current) / period`
//!
//! `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`, exactly 100 when the average
//! loss is zero. The first RSI value lands at index `period` of the closes.

use std::fmt;

/// RSI over `closes`, one slot per input close. Slots before index `period`
/// are `None` (warmup); everything is `None` when the series is too short.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return out;
    }

    let mut gains = Vec::with_capacity(closes.len() - 1);
    let mut losses = Vec::with_capacity(closes.len() - 1);
    for w in closes.windows(2) {
        let change = w[1] - w[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period + 1..closes.len() {
        // gains/losses are one shorter than closes; delta i-1 leads into close i.
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i - 1]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i - 1]) / period as f64;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Simple mean of the `period` closes ending at `idx` inclusive, or `None`
/// when the window does not fit.
pub fn sma_at(closes: &[f64], period: usize, idx: usize) -> Option<f64> {
    if period == 0 || idx >= closes.len() || idx + 1 < period {
        return None;
    }
    let start = idx + 1 - period;
    Some(closes[start..=idx].iter().sum::<f64>() / period as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Bullish,
    Bearish,
}

impl fmt::Display for CrossDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossDirection::Bullish => write!(f, "bullish"),
            CrossDirection::Bearish => write!(f, "bearish"),
        }
    }
}

/// Classify a fast/slow SMA pair across two adjacent candles.
pub fn classify_cross(
    prev_fast: f64,
    prev_slow: f64,
    fast: f64,
    slow: f64,
) -> Option<CrossDirection> {
    if prev_fast < prev_slow && fast >= slow {
        Some(CrossDirection::Bullish)
    } else if prev_fast > prev_slow && fast <= slow {
        Some(CrossDirection::Bearish)
    } else {
        None
    }
}
