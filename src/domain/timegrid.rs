//! Time-grid frequencies and timestamp snapping.
//!
//! A `Frequency` is a regular grid of instants anchored at the Unix epoch:
//! `"30m"` is every 1800 seconds, `"1h"` every 3600, `"1d"` every 86400.
//! Snapping moves an instant onto the grid; `Nearest` rounds up on an exact tie.

use crate::domain::error::AgentrankError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreqUnit {
    Minute,
    Hour,
    Day,
}

impl FreqUnit {
    fn seconds(self) -> i64 {
        match self {
            FreqUnit::Minute => 60,
            FreqUnit::Hour => 3600,
            FreqUnit::Day => 86400,
        }
    }
}

/// A candle/grid frequency, e.g. `30m`, `1h`, `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    count: u32,
    unit: FreqUnit,
}

impl Frequency {
    pub fn seconds(&self) -> i64 {
        self.count as i64 * self.unit.seconds()
    }
}

impl FromStr for Frequency {
    type Err = AgentrankError;

    /// Grammar: optional whitespace, a positive integer, optional whitespace,
    /// one unit character in `{m, h, d}` (case-insensitive), optional whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AgentrankError::InvalidFrequency {
            input: s.to_string(),
        };

        let trimmed = s.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        if digits_end == 0 {
            return Err(invalid());
        }

        let (digits, rest) = trimmed.split_at(digits_end);
        let count: u32 = digits.parse().map_err(|_| invalid())?;
        if count == 0 {
            return Err(invalid());
        }

        let unit = match rest.trim_start() {
            "m" | "M" => FreqUnit::Minute,
            "h" | "H" => FreqUnit::Hour,
            "d" | "D" => FreqUnit::Day,
            _ => return Err(invalid()),
        };

        Ok(Frequency { count, unit })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            FreqUnit::Minute => 'm',
            FreqUnit::Hour => 'h',
            FreqUnit::Day => 'd',
        };
        write!(f, "{}{}", self.count, unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapMode {
    Floor,
    Ceil,
    Nearest,
}

/// Snap `at` onto the `freq` grid. Works on whole epoch seconds; sub-second
/// precision is discarded. An instant already on the grid maps to itself in
/// every mode.
pub fn snap_to_interval(at: DateTime<Utc>, freq: &Frequency, mode: SnapMode) -> DateTime<Utc> {
    let step = freq.seconds();
    let ts = at.timestamp();
    let rem = ts.rem_euclid(step);

    let snapped = match mode {
        SnapMode::Floor => ts - rem,
        SnapMode::Ceil => {
            if rem == 0 {
                ts
            } else {
                ts + (step - rem)
            }
        }
        SnapMode::Nearest => {
            // Half-up: an exact midpoint rounds to the later grid point.
            if 2 * rem < step {
                ts - rem
            } else {
                ts + (step - rem)
            }
        }
    };

    DateTime::from_timestamp(snapped, 0).expect("snapped timestamp within datetime range")
}
