//! Round window value objects and evaluation results.

use crate::domain::error::AgentrankError;
use crate::domain::timegrid::{snap_to_interval, Frequency, SnapMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fixed scoring window. `key` is externally assigned and survives snapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub key: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl Round {
    /// Validating constructor for caller-supplied windows.
    pub fn new(
        key: impl Into<String>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Self, AgentrankError> {
        if window_end <= window_start {
            return Err(AgentrankError::InvalidWindow {
                reason: "window_start must be before window_end".into(),
            });
        }
        Ok(Round {
            key: key.into(),
            window_start,
            window_end,
        })
    }

    /// A copy of this round with both bounds snapped to the `timeframe` grid.
    /// Snapping may collapse the window; callers decide whether that is fatal.
    pub fn snapped(
        &self,
        timeframe: &str,
        start_mode: SnapMode,
        end_mode: SnapMode,
    ) -> Result<Round, AgentrankError> {
        let freq: Frequency = timeframe.parse()?;
        Ok(Round {
            key: self.key.clone(),
            window_start: snap_to_interval(self.window_start, &freq, start_mode),
            window_end: snap_to_interval(self.window_end, &freq, end_mode),
        })
    }
}

/// One scored observation. An agent appears once per scored observation, not
/// once per round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundAgentScore {
    pub agent_id: String,
    pub observation_id: String,
    pub score: f64,
}

/// Result of evaluating a round: scores sorted descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEvaluation {
    pub round: Round,
    pub agent_scores: Vec<RoundAgentScore>,
}
