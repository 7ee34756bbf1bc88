//! Agent observations, consumed from the observation store.

use serde::{Deserialize, Serialize};

/// One agent's directional judgment about one event/asset. `zi_score` is the
/// signed impact magnitude in [-2, 2] supplied by the upstream judgment source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub observation_id: Option<String>,
    pub agent_id: String,
    pub event_id: String,
    pub asset_symbol: Option<String>,
    pub zi_score: Option<i8>,
}

impl Observation {
    /// The trimmed asset symbol, if non-empty.
    pub fn symbol(&self) -> Option<&str> {
        self.asset_symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The trimmed observation id, if non-empty.
    pub fn id(&self) -> Option<&str> {
        self.observation_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Everything scoring needs, or `None`. An observation missing its symbol,
    /// zi score, or id is excluded from scoring by policy, not as an error.
    pub fn scoring_inputs(&self) -> Option<(&str, i8, &str)> {
        Some((self.symbol()?, self.zi_score?, self.id()?))
    }

    pub fn scoreable(&self) -> bool {
        self.scoring_inputs().is_some()
    }
}
