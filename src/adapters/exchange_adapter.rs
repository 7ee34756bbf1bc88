//! REST exchange adapter for Binance-compatible venues.

use crate::domain::candle::Candle;
use crate::domain::error::AgentrankError;
use crate::domain::timegrid::Frequency;
use crate::ports::candle_port::CandleSource;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const MAX_KLINES_PER_REQUEST: usize = 1000;

pub struct ExchangeAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    // Lazily populated set of "BASE/QUOTE" pairs the venue trades.
    markets: RwLock<Option<HashSet<String>>>,
}

impl ExchangeAdapter {
    pub fn new(base_url: Option<String>) -> Result<Self, AgentrankError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AgentrankError::MarketData {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            markets: RwLock::new(None),
        })
    }

    /// `BTC/USDT` -> `BTCUSDT`, the venue's concatenated form.
    fn venue_pair(symbol: &str) -> String {
        symbol.replace('/', "").to_uppercase()
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, AgentrankError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| AgentrankError::MarketData {
                reason: format!("request to {path} failed: {e}"),
            })?;
        if !response.status().is_success() {
            return Err(AgentrankError::MarketData {
                reason: format!("{path} returned HTTP {}", response.status()),
            });
        }
        response.json().map_err(|e| AgentrankError::MarketData {
            reason: format!("invalid JSON from {path}: {e}"),
        })
    }

    fn load_markets(&self) -> Result<HashSet<String>, AgentrankError> {
        let body = self.get_json("/api/v3/exchangeInfo", &[])?;
        let symbols = body
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| AgentrankError::MarketData {
                reason: "exchangeInfo response missing symbols array".into(),
            })?;
        let mut markets = HashSet::with_capacity(symbols.len());
        for entry in symbols {
            let (Some(base), Some(quote)) = (
                entry.get("baseAsset").and_then(Value::as_str),
                entry.get("quoteAsset").and_then(Value::as_str),
            ) else {
                continue;
            };
            markets.insert(format!("{base}/{quote}"));
        }
        tracing::debug!(markets = markets.len(), "loaded venue market list");
        Ok(markets)
    }
}

/// Parses the venue's kline rows: `[open_time, "o", "h", "l", "c", "v", ...]`.
/// Malformed rows are dropped; the result is sorted and deduplicated by
/// open time with later rows winning.
fn parse_klines(rows: &[Value]) -> Vec<Candle> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(fields) = row.as_array() else {
            tracing::debug!("skipping non-array kline row");
            continue;
        };
        let ts_ms = fields.first().and_then(Value::as_i64);
        let price = |i: usize| {
            fields
                .get(i)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<f64>().ok())
        };
        let (Some(ts_ms), Some(open), Some(high), Some(low), Some(close), Some(volume)) =
            (ts_ms, price(1), price(2), price(3), price(4), price(5))
        else {
            tracing::debug!("skipping malformed kline row");
            continue;
        };
        out.push(Candle {
            ts_ms,
            open,
            high,
            low,
            close,
            volume,
        });
    }
    crate::domain::candle::merge_candles(out, Vec::new())
}

impl CandleSource for ExchangeAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, AgentrankError> {
        let interval: Frequency = timeframe.parse()?;
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST);
        let body = self.get_json(
            "/api/v3/klines",
            &[
                ("symbol", Self::venue_pair(symbol)),
                ("interval", interval.to_string()),
                ("startTime", since_ms.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        let rows = body.as_array().ok_or_else(|| AgentrankError::MarketData {
            reason: "klines response is not an array".into(),
        })?;
        Ok(parse_klines(rows))
    }

    fn timeframe_seconds(&self, timeframe: &str) -> Result<i64, AgentrankError> {
        let freq: Frequency = timeframe.parse()?;
        Ok(freq.seconds())
    }

    fn has_market(&self, symbol: &str) -> Result<bool, AgentrankError> {
        {
            let cache = self
                .markets
                .read()
                .map_err(|_| AgentrankError::MarketData {
                    reason: "market cache lock poisoned".into(),
                })?;
            if let Some(markets) = cache.as_ref() {
                return Ok(markets.contains(symbol));
            }
        }
        self.refresh_markets()?;
        let cache = self
            .markets
            .read()
            .map_err(|_| AgentrankError::MarketData {
                reason: "market cache lock poisoned".into(),
            })?;
        Ok(cache
            .as_ref()
            .is_some_and(|markets| markets.contains(symbol)))
    }

    fn refresh_markets(&self) -> Result<(), AgentrankError> {
        let markets = self.load_markets()?;
        let mut cache = self
            .markets
            .write()
            .map_err(|_| AgentrankError::MarketData {
                reason: "market cache lock poisoned".into(),
            })?;
        *cache = Some(markets);
        Ok(())
    }
}
