#![allow(dead_code)]

use agentrank::domain::candle::Candle;
use agentrank::domain::error::AgentrankError;
use agentrank::domain::observation::Observation;
use agentrank::domain::round::RoundEvaluation;
use agentrank::ports::candle_port::CandleSource;
use agentrank::ports::observation_port::ObservationStore;
use agentrank::ports::round_port::{RoundStore, SaveOutcome};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

pub const HOUR_MS: i64 = 3_600_000;

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn flat_candle(ts_ms: i64, close: f64) -> Candle {
    Candle {
        ts_ms,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

/// Contiguous flat-close candles starting at `start_ms`, one per `frame_ms`.
pub fn candle_run(start_ms: i64, frame_ms: i64, closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| flat_candle(start_ms + i as i64 * frame_ms, close))
        .collect()
}

pub struct MockCandleSource {
    pub candles: HashMap<String, Vec<Candle>>,
    pub markets: RefCell<HashSet<String>>,
    /// Markets that only appear after a refresh.
    pub markets_after_refresh: HashSet<String>,
    /// When set, fetches return at most this many candles regardless of the
    /// requested limit; exercises the corrective-fetch path.
    pub max_page: Option<usize>,
    pub fetch_calls: Cell<usize>,
    pub refresh_calls: Cell<usize>,
}

impl MockCandleSource {
    pub fn new() -> Self {
        Self {
            candles: HashMap::new(),
            markets: RefCell::new(HashSet::new()),
            markets_after_refresh: HashSet::new(),
            max_page: None,
            fetch_calls: Cell::new(0),
            refresh_calls: Cell::new(0),
        }
    }

    pub fn with_market(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.markets.borrow_mut().insert(symbol.to_string());
        self.candles.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_market_after_refresh(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.markets_after_refresh.insert(symbol.to_string());
        self.candles.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_max_page(mut self, max_page: usize) -> Self {
        self.max_page = Some(max_page);
        self
    }
}

impl CandleSource for MockCandleSource {
    fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: &str,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, AgentrankError> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        let all = self.candles.get(symbol).ok_or_else(|| {
            AgentrankError::MarketData {
                reason: format!("no fixture for {symbol}"),
            }
        })?;
        let limit = self.max_page.map_or(limit, |p| limit.min(p));
        Ok(all
            .iter()
            .filter(|c| c.ts_ms >= since_ms)
            .take(limit)
            .cloned()
            .collect())
    }

    fn timeframe_seconds(&self, timeframe: &str) -> Result<i64, AgentrankError> {
        let freq: agentrank::domain::timegrid::Frequency = timeframe.parse()?;
        Ok(freq.seconds())
    }

    fn has_market(&self, symbol: &str) -> Result<bool, AgentrankError> {
        Ok(self.markets.borrow().contains(symbol))
    }

    fn refresh_markets(&self) -> Result<(), AgentrankError> {
        self.refresh_calls.set(self.refresh_calls.get() + 1);
        let mut markets = self.markets.borrow_mut();
        for symbol in &self.markets_after_refresh {
            markets.insert(symbol.clone());
        }
        Ok(())
    }
}

pub struct MockObservationStore {
    pub observations: Vec<Observation>,
}

impl MockObservationStore {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }
}

impl ObservationStore for MockObservationStore {
    fn list_in_window(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, AgentrankError> {
        Ok(self.observations.clone())
    }
}

pub fn observation(agent: &str, obs_id: &str, symbol: &str, zi: i8) -> Observation {
    Observation {
        observation_id: Some(obs_id.to_string()),
        agent_id: agent.to_string(),
        event_id: format!("ev-{obs_id}"),
        asset_symbol: Some(symbol.to_string()),
        zi_score: Some(zi),
    }
}

#[derive(Default)]
pub struct MockRoundStore {
    pub saved: RefCell<Vec<RoundEvaluation>>,
    pub known_keys: HashSet<String>,
    pub fail_save: bool,
}

impl MockRoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_save: true,
            ..Self::default()
        }
    }

    pub fn with_known_keys(keys: &[&str]) -> Self {
        Self {
            known_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl RoundStore for MockRoundStore {
    fn save_evaluation(&self, evaluation: &RoundEvaluation) -> Result<SaveOutcome, AgentrankError> {
        if self.fail_save {
            return Err(AgentrankError::Storage {
                reason: "simulated storage failure".into(),
            });
        }
        self.saved.borrow_mut().push(evaluation.clone());
        Ok(SaveOutcome {
            inserted_round: 1,
            inserted_scores: evaluation.agent_scores.len(),
            total_scores: evaluation.agent_scores.len(),
            ..Default::default()
        })
    }

    fn existing_round_keys(&self, keys: &[String]) -> Result<HashSet<String>, AgentrankError> {
        Ok(keys
            .iter()
            .filter(|k| self.known_keys.contains(*k))
            .cloned()
            .collect())
    }
}
