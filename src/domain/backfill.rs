//! Backfill driver: evaluates the N most recent fully closed round windows.

use crate::domain::error::AgentrankError;
use crate::domain::evaluation::RoundEvaluator;
use crate::domain::round::Round;
use crate::domain::timegrid::{self, Frequency, SnapMode};
use crate::ports::round_port::RoundStore;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillResult {
    pub requested: usize,
    pub existing: usize,
    pub processed: usize,
    pub failed: usize,
}

fn round_key(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "round-{}-{}",
        start.format("%Y%m%d%H%M"),
        end.format("%Y%m%d%H%M")
    )
}

/// Walks back `count` consecutive windows of `timeframe` length ending at the
/// last closed boundary before `now`, skipping keys already persisted. A
/// failed evaluation is logged and counted in `failed` rather than aborting
/// the run; `processed` counts every attempt.
pub fn run_backfill(
    evaluator: &RoundEvaluator<'_>,
    rounds: &dyn RoundStore,
    count: usize,
    timeframe: &str,
    quote: &str,
    now: DateTime<Utc>,
) -> Result<BackfillResult, AgentrankError> {
    if count == 0 {
        return Ok(BackfillResult::default());
    }
    let freq: Frequency = timeframe.parse()?;
    let anchor = timegrid::snap_to_interval(now, &freq, SnapMode::Floor);
    let step = Duration::seconds(freq.seconds());

    let mut windows = Vec::with_capacity(count);
    for i in 0..count {
        let end = anchor - step * i as i32;
        let start = end - step;
        windows.push((round_key(start, end), start, end));
    }

    let keys: Vec<String> = windows.iter().map(|(k, _, _)| k.clone()).collect();
    let existing = rounds.existing_round_keys(&keys)?;

    let mut result = BackfillResult {
        requested: count,
        existing: existing.len(),
        ..Default::default()
    };

    for (key, start, end) in windows {
        if existing.contains(&key) {
            tracing::debug!(%key, "round already evaluated, skipping");
            continue;
        }
        let round = Round::new(key.clone(), start, end)?;
        result.processed += 1;
        if let Err(err) = evaluator.evaluate(&round, timeframe, quote) {
            tracing::warn!(%key, error = %err, "round evaluation failed, continuing");
            result.failed += 1;
        }
    }

    tracing::info!(
        requested = result.requested,
        existing = result.existing,
        processed = result.processed,
        failed = result.failed,
        "backfill complete"
    );
    Ok(result)
}
