//! Domain error types.

use chrono::{DateTime, Utc};

/// Top-level error type for agentrank.
#[derive(Debug, thiserror::Error)]
pub enum AgentrankError {
    #[error("invalid frequency {input:?}: expected an integer and a unit, like '30m', '1h', '1d'")]
    InvalidFrequency { input: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("market symbol not found on exchange: {symbol}")]
    UnknownMarket { symbol: String },

    #[error("insufficient candle data for {symbol}: {reason}")]
    InsufficientData { symbol: String, reason: String },

    #[error("invalid evaluation window: {reason}")]
    InvalidWindow { reason: String },

    #[error("round window_end {end} is in the future")]
    FutureWindow { end: DateTime<Utc> },

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AgentrankError> for std::process::ExitCode {
    fn from(err: &AgentrankError) -> Self {
        let code: u8 = match err {
            AgentrankError::Io(_) => 1,
            AgentrankError::ConfigParse { .. }
            | AgentrankError::ConfigMissing { .. }
            | AgentrankError::ConfigInvalid { .. } => 2,
            AgentrankError::MarketData { .. } | AgentrankError::Storage { .. } => 3,
            AgentrankError::InvalidFrequency { .. } | AgentrankError::InvalidArgument { .. } => 4,
            AgentrankError::UnknownMarket { .. }
            | AgentrankError::InsufficientData { .. }
            | AgentrankError::InvalidWindow { .. }
            | AgentrankError::FutureWindow { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
