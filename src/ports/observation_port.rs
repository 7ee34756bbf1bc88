//! Observation access port trait.

use crate::domain::error::AgentrankError;
use crate::domain::observation::Observation;
use chrono::{DateTime, Utc};

pub trait ObservationStore {
    /// Observations whose parent event occurred in `[start, end)`.
    fn list_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, AgentrankError>;
}
