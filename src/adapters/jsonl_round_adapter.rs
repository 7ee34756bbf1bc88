//! JSON Lines round persistence adapter.
//!
//! One JSON object per line, keyed by round key. Saving re-reads the whole
//! file, upserts the round, and rewrites it; round files are small enough
//! that this stays cheap.

use crate::domain::error::AgentrankError;
use crate::domain::round::{RoundAgentScore, RoundEvaluation};
use crate::ports::round_port::{RoundStore, SaveOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRound {
    key: String,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    scores: Vec<RoundAgentScore>,
}

pub struct JsonlRoundAdapter {
    path: PathBuf,
}

impl JsonlRoundAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> Result<Vec<StoredRound>, AgentrankError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| AgentrankError::Storage {
            reason: format!("failed to read {}: {e}", self.path.display()),
        })?;
        let mut rounds = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let round: StoredRound =
                serde_json::from_str(line).map_err(|e| AgentrankError::Storage {
                    reason: format!("line {}: invalid round record: {e}", i + 1),
                })?;
            rounds.push(round);
        }
        Ok(rounds)
    }

    fn write_all(&self, rounds: &[StoredRound]) -> Result<(), AgentrankError> {
        let mut out = String::new();
        for round in rounds {
            let line = serde_json::to_string(round).map_err(|e| AgentrankError::Storage {
                reason: format!("failed to serialize round {}: {e}", round.key),
            })?;
            out.push_str(&line);
            out.push('\n');
        }
        fs::write(&self.path, out).map_err(|e| AgentrankError::Storage {
            reason: format!("failed to write {}: {e}", self.path.display()),
        })
    }
}

fn count_score_changes(new: &[RoundAgentScore], previous: &[RoundAgentScore]) -> (usize, usize) {
    let known: HashSet<&str> = previous.iter().map(|s| s.observation_id.as_str()).collect();
    let updated = new
        .iter()
        .filter(|s| known.contains(s.observation_id.as_str()))
        .count();
    (new.len() - updated, updated)
}

impl RoundStore for JsonlRoundAdapter {
    fn save_evaluation(&self, evaluation: &RoundEvaluation) -> Result<SaveOutcome, AgentrankError> {
        let mut rounds = self.read_all()?;
        let round = &evaluation.round;

        let stored = StoredRound {
            key: round.key.clone(),
            window_start: round.window_start,
            window_end: round.window_end,
            updated_at: Utc::now(),
            scores: evaluation.agent_scores.clone(),
        };

        let mut outcome = SaveOutcome {
            total_scores: evaluation.agent_scores.len(),
            ..Default::default()
        };
        match rounds.iter_mut().find(|r| r.key == round.key) {
            Some(existing) => {
                let (inserted, updated) =
                    count_score_changes(&evaluation.agent_scores, &existing.scores);
                outcome.updated_round = 1;
                outcome.inserted_scores = inserted;
                outcome.updated_scores = updated;
                *existing = stored;
            }
            None => {
                outcome.inserted_round = 1;
                outcome.inserted_scores = evaluation.agent_scores.len();
                rounds.push(stored);
            }
        }
        self.write_all(&rounds)?;
        Ok(outcome)
    }

    fn existing_round_keys(&self, keys: &[String]) -> Result<HashSet<String>, AgentrankError> {
        let stored: HashSet<String> = self.read_all()?.into_iter().map(|r| r.key).collect();
        Ok(keys
            .iter()
            .filter(|k| stored.contains(*k))
            .cloned()
            .collect())
    }
}
