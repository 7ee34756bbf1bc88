//! Round evaluation: turns a window of observations into a score leaderboard.

use crate::domain::engine::IndicatorEngine;
use crate::domain::error::AgentrankError;
use crate::domain::round::{Round, RoundAgentScore, RoundEvaluation};
use crate::domain::timegrid::SnapMode;
use crate::ports::candle_port::CandleSource;
use crate::ports::observation_port::ObservationStore;
use crate::ports::round_port::RoundStore;
use chrono::Utc;
use std::collections::{HashMap, HashSet};

pub struct RoundEvaluator<'a> {
    candles: &'a dyn CandleSource,
    observations: &'a dyn ObservationStore,
    rounds: Option<&'a dyn RoundStore>,
}

impl<'a> RoundEvaluator<'a> {
    pub fn new(
        candles: &'a dyn CandleSource,
        observations: &'a dyn ObservationStore,
        rounds: Option<&'a dyn RoundStore>,
    ) -> Self {
        Self {
            candles,
            observations,
            rounds,
        }
    }

    /// Scores every scoreable observation in the round's window.
    ///
    /// Each score is `pct_change * zi_score` over the snapped window on the
    /// observation's market. Observations missing a symbol or zi score are
    /// skipped, as are symbols whose price lookup already failed once this
    /// round. Persistence is best effort: a storage failure is logged and the
    /// evaluation is still returned.
    pub fn evaluate(
        &self,
        round: &Round,
        timeframe: &str,
        quote: &str,
    ) -> Result<RoundEvaluation, AgentrankError> {
        let snapped = round.snapped(timeframe, SnapMode::Floor, SnapMode::Floor)?;
        if snapped.window_end <= snapped.window_start {
            return Err(AgentrankError::InvalidWindow {
                reason: format!(
                    "window collapses to nothing when snapped to {timeframe} candles"
                ),
            });
        }
        if snapped.window_end > Utc::now() {
            return Err(AgentrankError::FutureWindow {
                end: snapped.window_end,
            });
        }

        let observations = self
            .observations
            .list_in_window(snapped.window_start, snapped.window_end)?;
        tracing::info!(
            round = %round.key,
            observations = observations.len(),
            "evaluating round"
        );

        let engine = IndicatorEngine::new(self.candles);
        let mut pct_cache: HashMap<String, f64> = HashMap::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut agent_scores = Vec::new();

        for obs in &observations {
            let Some((symbol, zi, observation_id)) = obs.scoring_inputs() else {
                tracing::debug!(agent = %obs.agent_id, "observation not scoreable, skipping");
                continue;
            };
            let symbol = symbol.to_uppercase();
            if failed.contains(&symbol) {
                continue;
            }
            let pct = match pct_cache.get(&symbol) {
                Some(pct) => *pct,
                None => match engine.get_price_change(
                    &symbol,
                    quote,
                    snapped.window_start,
                    snapped.window_end,
                    timeframe,
                ) {
                    Ok(change) => {
                        pct_cache.insert(symbol.clone(), change.pct_change);
                        change.pct_change
                    }
                    Err(err) => {
                        tracing::warn!(%symbol, error = %err, "price lookup failed, skipping symbol");
                        failed.insert(symbol);
                        continue;
                    }
                },
            };
            agent_scores.push(RoundAgentScore {
                agent_id: obs.agent_id.clone(),
                observation_id: observation_id.to_string(),
                score: pct * f64::from(zi),
            });
        }

        // Stable: equal scores keep observation order.
        agent_scores.sort_by(|a, b| b.score.total_cmp(&a.score));

        let evaluation = RoundEvaluation {
            round: round.clone(),
            agent_scores,
        };

        if let Some(store) = self.rounds {
            match store.save_evaluation(&evaluation) {
                Ok(outcome) => tracing::info!(
                    round = %round.key,
                    inserted = outcome.inserted_scores,
                    updated = outcome.updated_scores,
                    "evaluation persisted"
                ),
                Err(err) => {
                    tracing::warn!(round = %round.key, error = %err, "failed to persist evaluation")
                }
            }
        }

        Ok(evaluation)
    }
}
