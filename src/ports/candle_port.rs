//! Market-data access port trait.

use crate::domain::candle::Candle;
use crate::domain::error::AgentrankError;

/// OHLCV source for a trading venue.
///
/// Contract: `fetch_candles` returns a timestamp-sorted, deduplicated series
/// of candles opening at or after `since_ms`, at most `limit` long; gaps are
/// allowed. `timeframe_seconds` rejects unrecognized timeframe strings.
/// `has_market` consults a symbol cache which `refresh_markets` reloads.
pub trait CandleSource {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, AgentrankError>;

    fn timeframe_seconds(&self, timeframe: &str) -> Result<i64, AgentrankError>;

    fn has_market(&self, symbol: &str) -> Result<bool, AgentrankError>;

    fn refresh_markets(&self) -> Result<(), AgentrankError>;
}
