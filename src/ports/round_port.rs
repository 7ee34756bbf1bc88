//! Round persistence port trait.

use crate::domain::error::AgentrankError;
use crate::domain::round::RoundEvaluation;
use std::collections::HashSet;

/// Upsert counters returned by [`RoundStore::save_evaluation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub inserted_round: usize,
    pub updated_round: usize,
    pub inserted_scores: usize,
    pub updated_scores: usize,
    pub total_scores: usize,
}

pub trait RoundStore {
    fn save_evaluation(&self, evaluation: &RoundEvaluation) -> Result<SaveOutcome, AgentrankError>;

    /// The subset of `keys` already persisted; backfill drivers use this to
    /// skip windows that were evaluated before.
    fn existing_round_keys(&self, keys: &[String]) -> Result<HashSet<String>, AgentrankError>;
}
