//! CSV observation adapter.
//!
//! Expects a header row and the columns
//! `observation_id,agent_id,event_id,event_time,asset_symbol,zi_score`
//! where `event_time` is RFC 3339. `asset_symbol` and `zi_score` may be
//! empty; the observation then loads but is not scoreable.

use crate::domain::error::AgentrankError;
use crate::domain::observation::Observation;
use crate::ports::observation_port::ObservationStore;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;

pub struct CsvObservationAdapter {
    path: PathBuf,
}

impl CsvObservationAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn storage_err(reason: String) -> AgentrankError {
        AgentrankError::Storage { reason }
    }
}

fn optional_field(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_zi(value: &str, line: usize) -> Result<Option<i8>, AgentrankError> {
    let Some(raw) = optional_field(value) else {
        return Ok(None);
    };
    let zi: i8 = raw.parse().map_err(|_| AgentrankError::Storage {
        reason: format!("line {line}: zi_score '{raw}' is not an integer"),
    })?;
    if !(-2..=2).contains(&zi) {
        return Err(AgentrankError::Storage {
            reason: format!("line {line}: zi_score {zi} outside -2..=2"),
        });
    }
    Ok(Some(zi))
}

impl ObservationStore for CsvObservationAdapter {
    fn list_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, AgentrankError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            Self::storage_err(format!("failed to read {}: {e}", self.path.display()))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut observations = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let line = i + 2; // header is line 1
            let record =
                result.map_err(|e| Self::storage_err(format!("line {line}: {e}")))?;

            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .ok_or_else(|| Self::storage_err(format!("line {line}: missing {name}")))
            };

            let event_time_str = field(3, "event_time")?;
            let event_time = DateTime::parse_from_rfc3339(event_time_str.trim())
                .map_err(|e| {
                    Self::storage_err(format!("line {line}: invalid event_time: {e}"))
                })?
                .with_timezone(&Utc);
            if event_time < start || event_time >= end {
                continue;
            }

            let agent_id = field(1, "agent_id")?.trim().to_string();
            if agent_id.is_empty() {
                return Err(Self::storage_err(format!("line {line}: empty agent_id")));
            }

            observations.push(Observation {
                observation_id: optional_field(field(0, "observation_id")?),
                agent_id,
                event_id: field(2, "event_id")?.trim().to_string(),
                asset_symbol: optional_field(field(4, "asset_symbol")?),
                zi_score: parse_zi(field(5, "zi_score")?, line)?,
            });
        }

        Ok(observations)
    }
}
