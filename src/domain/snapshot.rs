//! One-line indicator snapshot for a market at an instant.

use crate::domain::engine::IndicatorEngine;
use crate::ports::candle_port::CandleSource;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SnapshotParams {
    pub timeframe: String,
    pub rsi_period: usize,
    pub sma_fast: usize,
    pub sma_slow: usize,
}

impl Default for SnapshotParams {
    fn default() -> Self {
        Self {
            timeframe: "1h".to_string(),
            rsi_period: 14,
            sma_fast: 50,
            sma_slow: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSnapshot {
    pub text: String,
}

/// Renders `RSI(p,tf)=v SMAf/s(tf)=f/s,label` for the market at `at`.
///
/// Each indicator slot degrades to `NA` on its own failure, whatever the
/// cause; one starved indicator or an unknown market never loses the line.
pub fn build_snapshot(
    source: &dyn CandleSource,
    base: &str,
    quote: &str,
    at: DateTime<Utc>,
    params: &SnapshotParams,
) -> IndicatorSnapshot {
    let engine = IndicatorEngine::new(source);
    let tf = params.timeframe.as_str();

    let rsi_text = match engine.get_rsi(base, quote, at, tf, params.rsi_period) {
        Ok(v) => format!("{v:.2}"),
        Err(err) => {
            tracing::debug!(symbol = base, error = %err, "RSI unavailable for snapshot");
            "NA".to_string()
        }
    };

    let cross_text = match engine.get_sma_cross(base, quote, at, tf, params.sma_fast, params.sma_slow)
    {
        Ok(cross) => {
            let label = cross
                .crossed
                .map(|d| d.to_string())
                .unwrap_or_else(|| "no-cross".to_string());
            format!("{:.2}/{:.2},{label}", cross.fast, cross.slow)
        }
        Err(err) => {
            tracing::debug!(symbol = base, error = %err, "SMA cross unavailable for snapshot");
            "NA".to_string()
        }
    };

    IndicatorSnapshot {
        text: format!(
            "RSI({},{tf})={rsi_text} SMA{}/{}({tf})={cross_text}",
            params.rsi_period, params.sma_fast, params.sma_slow
        ),
    }
}
