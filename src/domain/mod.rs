//! Core domain types and logic.

pub mod backfill;
pub mod candle;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod indicator;
pub mod observation;
pub mod round;
pub mod snapshot;
pub mod timegrid;
