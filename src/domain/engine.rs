//! Query-time indicator computation over a candle source.
//!
//! Every operation resolves a target candle (the last fully closed candle at
//! or before the query instant), fetches a lookback window ending there, and
//! patches provider boundary quirks with one corrective forward fetch merged
//! later-wins. Indicators are computed fresh per call; there is no running
//! state, so any historical instant can be queried reproducibly.

use crate::domain::candle::{self, Candle};
use crate::domain::error::AgentrankError;
use crate::domain::indicator::{self, CrossDirection};
use crate::ports::candle_port::CandleSource;
use chrono::{DateTime, Utc};

/// Fast/slow SMA pair at the target candle and the one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct SmaCross {
    pub fast: f64,
    pub slow: f64,
    pub prev_fast: f64,
    pub prev_slow: f64,
    pub crossed: Option<CrossDirection>,
}

/// Close-to-close price move between two resolved candles.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub start_ts: i64,
    pub end_ts: i64,
    pub start_price: f64,
    pub end_price: f64,
    pub abs_change: f64,
    pub pct_change: f64,
}

pub struct IndicatorEngine<'a> {
    source: &'a dyn CandleSource,
}

impl<'a> IndicatorEngine<'a> {
    pub fn new(source: &'a dyn CandleSource) -> Self {
        Self { source }
    }

    /// `BTC`, `usdt` -> `BTC/USDT`.
    pub fn market_symbol(base: &str, quote: &str) -> String {
        format!(
            "{}/{}",
            base.trim().to_uppercase(),
            quote.trim().to_uppercase()
        )
    }

    /// Wilder-smoothed RSI of the target candle's close.
    pub fn get_rsi(
        &self,
        base: &str,
        quote: &str,
        at: DateTime<Utc>,
        timeframe: &str,
        period: usize,
    ) -> Result<f64, AgentrankError> {
        require_positive_period(period)?;
        let symbol = Self::market_symbol(base, quote);
        self.ensure_market(&symbol)?;
        let frame_ms = self.frame_ms(timeframe)?;
        let target_ms = candle::last_closed_ts(at.timestamp_millis(), frame_ms);

        // 3x the period to let Wilder's smoothing settle before the target.
        let lookback = period * 3;
        let since_ms = target_ms - lookback as i64 * frame_ms;
        let candles = self.fetch_aligned(
            &symbol,
            timeframe,
            since_ms,
            lookback + 2,
            target_ms,
            period + 2,
        )?;
        if candles.is_empty() {
            return Err(AgentrankError::InsufficientData {
                symbol,
                reason: "no candles returned".into(),
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi = indicator::rsi_series(&closes, period);

        // Exact target preferred; otherwise the closest value at or before it.
        let mut before_target = None;
        for (c, v) in candles.iter().zip(&rsi) {
            if let Some(v) = v {
                if c.ts_ms == target_ms {
                    return Ok(*v);
                }
                if c.ts_ms < target_ms {
                    before_target = Some(*v);
                }
            }
        }
        before_target.ok_or_else(|| AgentrankError::InsufficientData {
            symbol,
            reason: "no RSI value at or before the requested time".into(),
        })
    }

    /// Simple moving average of the `period` closes ending at the target candle.
    pub fn get_sma(
        &self,
        base: &str,
        quote: &str,
        at: DateTime<Utc>,
        timeframe: &str,
        period: usize,
    ) -> Result<f64, AgentrankError> {
        require_positive_period(period)?;
        let symbol = Self::market_symbol(base, quote);
        self.ensure_market(&symbol)?;
        let frame_ms = self.frame_ms(timeframe)?;
        let target_ms = candle::last_closed_ts(at.timestamp_millis(), frame_ms);

        let since_ms = target_ms - (period as i64 - 1) * frame_ms;
        let candles = self.fetch_aligned(
            &symbol,
            timeframe,
            since_ms,
            period + 2,
            target_ms,
            period + 2,
        )?;

        let idx = candle::index_of_ts(&candles, target_ms).ok_or_else(|| {
            AgentrankError::InsufficientData {
                symbol: symbol.clone(),
                reason: "target candle missing from provider data".into(),
            }
        })?;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        indicator::sma_at(&closes, period, idx).ok_or_else(|| AgentrankError::InsufficientData {
            symbol,
            reason: format!("have {} candles before target, need {}", idx + 1, period),
        })
    }

    /// Fast/slow SMA values at the target candle and its predecessor, with
    /// cross classification between the two.
    pub fn get_sma_cross(
        &self,
        base: &str,
        quote: &str,
        at: DateTime<Utc>,
        timeframe: &str,
        fast_period: usize,
        slow_period: usize,
    ) -> Result<SmaCross, AgentrankError> {
        require_positive_period(fast_period)?;
        require_positive_period(slow_period)?;
        if fast_period >= slow_period {
            return Err(AgentrankError::InvalidArgument {
                reason: "fast_period must be less than slow_period".into(),
            });
        }
        let symbol = Self::market_symbol(base, quote);
        self.ensure_market(&symbol)?;
        let frame_ms = self.frame_ms(timeframe)?;
        let target_ms = candle::last_closed_ts(at.timestamp_millis(), frame_ms);

        // slow_period + 1 candles cover both the current and previous windows.
        let required = slow_period + 1;
        let since_ms = target_ms - (required as i64 - 1) * frame_ms;
        let candles = self.fetch_aligned(
            &symbol,
            timeframe,
            since_ms,
            required + 3,
            target_ms,
            slow_period + 3,
        )?;

        let insufficient = |reason: &str| AgentrankError::InsufficientData {
            symbol: symbol.clone(),
            reason: reason.into(),
        };
        let idx = candle::index_of_ts(&candles, target_ms)
            .ok_or_else(|| insufficient("target candle missing from provider data"))?;
        if idx < slow_period {
            return Err(insufficient("not enough history before target"));
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let (Some(fast), Some(slow), Some(prev_fast), Some(prev_slow)) = (
            indicator::sma_at(&closes, fast_period, idx),
            indicator::sma_at(&closes, slow_period, idx),
            indicator::sma_at(&closes, fast_period, idx - 1),
            indicator::sma_at(&closes, slow_period, idx - 1),
        ) else {
            return Err(insufficient("not enough history for both SMA windows"));
        };

        Ok(SmaCross {
            fast,
            slow,
            prev_fast,
            prev_slow,
            crossed: indicator::classify_cross(prev_fast, prev_slow, fast, slow),
        })
    }

    /// Price change between the target candles of `start` and `end`.
    ///
    /// Unlike the alignment-strict indicators above, each bound tolerates gaps:
    /// the closest candle at or before the bound's target is used.
    pub fn get_price_change(
        &self,
        base: &str,
        quote: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: &str,
    ) -> Result<PriceChange, AgentrankError> {
        if end <= start {
            return Err(AgentrankError::InvalidArgument {
                reason: "end must be after start".into(),
            });
        }
        let symbol = Self::market_symbol(base, quote);
        self.ensure_market(&symbol)?;
        let frame_ms = self.frame_ms(timeframe)?;
        let start_target = candle::last_closed_ts(start.timestamp_millis(), frame_ms);
        let end_target = candle::last_closed_ts(end.timestamp_millis(), frame_ms);

        // Two candles of padding absorb provider boundary quirks at the edges.
        let since_ms = start_target - 2 * frame_ms;
        let limit = ((end_target - since_ms) / frame_ms) as usize + 2;
        let candles = self.fetch_aligned(&symbol, timeframe, since_ms, limit, end_target, 4)?;

        let start_candle =
            candle::closest_at_or_before(&candles, start_target).ok_or_else(|| {
                AgentrankError::InsufficientData {
                    symbol: symbol.clone(),
                    reason: "no candle at or before the window start".into(),
                }
            })?;
        let end_candle = candle::closest_at_or_before(&candles, end_target).ok_or_else(|| {
            AgentrankError::InsufficientData {
                symbol: symbol.clone(),
                reason: "no candle at or before the window end".into(),
            }
        })?;

        let start_price = start_candle.close;
        let end_price = end_candle.close;
        let abs_change = end_price - start_price;
        let pct_change = if start_price == 0.0 {
            0.0
        } else {
            abs_change / start_price * 100.0
        };

        Ok(PriceChange {
            start_ts: start_candle.ts_ms,
            end_ts: end_candle.ts_ms,
            start_price,
            end_price,
            abs_change,
            pct_change,
        })
    }

    /// Symbol existence check with one cache-refresh retry.
    fn ensure_market(&self, symbol: &str) -> Result<(), AgentrankError> {
        if self.source.has_market(symbol)? {
            return Ok(());
        }
        self.source.refresh_markets()?;
        if self.source.has_market(symbol)? {
            Ok(())
        } else {
            Err(AgentrankError::UnknownMarket {
                symbol: symbol.to_string(),
            })
        }
    }

    fn frame_ms(&self, timeframe: &str) -> Result<i64, AgentrankError> {
        let secs = self.source.timeframe_seconds(timeframe)?;
        if secs <= 0 {
            return Err(AgentrankError::InvalidArgument {
                reason: format!("invalid timeframe: {timeframe}"),
            });
        }
        Ok(secs * 1000)
    }

    /// Lookback fetch plus one corrective forward fetch when the target candle
    /// is absent (some providers ignore `since` granularity). The corrective
    /// fetch wins on timestamp collision.
    fn fetch_aligned(
        &self,
        symbol: &str,
        timeframe: &str,
        since_ms: i64,
        limit: usize,
        target_ms: i64,
        corrective_limit: usize,
    ) -> Result<Vec<Candle>, AgentrankError> {
        let mut candles = self
            .source
            .fetch_candles(symbol, timeframe, since_ms, limit)?;
        if candle::index_of_ts(&candles, target_ms).is_none() {
            tracing::debug!(
                symbol,
                target_ms,
                "target candle missing, issuing corrective fetch"
            );
            let more = self
                .source
                .fetch_candles(symbol, timeframe, target_ms, corrective_limit)?;
            candles = candle::merge_candles(candles, more);
        }
        Ok(candles)
    }
}

fn require_positive_period(period: usize) -> Result<(), AgentrankError> {
    if period == 0 {
        return Err(AgentrankError::InvalidArgument {
            reason: "period must be positive".into(),
        });
    }
    Ok(())
}
