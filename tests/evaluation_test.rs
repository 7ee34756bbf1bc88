//! Round evaluation and backfill tests over mock ports.

mod common;

use agentrank::domain::backfill;
use agentrank::domain::error::AgentrankError;
use agentrank::domain::evaluation::RoundEvaluator;
use agentrank::domain::observation::Observation;
use agentrank::domain::round::Round;
use common::*;

// 2024-01-01T00:00:00Z, hour-aligned.
const BASE_MS: i64 = 1_704_067_200_000;

/// BTC moves 100 -> 105 (+5%) and ETH 100 -> 98 (-2%) over the 12:00-13:00
/// round window's target candles (11:00 and 12:00 closes).
fn market_fixture() -> MockCandleSource {
    MockCandleSource::new()
        .with_market(
            "BTC/USDT",
            candle_run(BASE_MS + 9 * HOUR_MS, HOUR_MS, &[99.0, 99.5, 100.0, 105.0]),
        )
        .with_market(
            "ETH/USDT",
            candle_run(BASE_MS + 9 * HOUR_MS, HOUR_MS, &[101.0, 100.5, 100.0, 98.0]),
        )
}

fn noon_round() -> Round {
    Round::new(
        "round-202401011200-202401011300",
        utc(2024, 1, 1, 12, 0),
        utc(2024, 1, 1, 13, 0),
    )
    .unwrap()
}

#[test]
fn scores_are_pct_change_times_zi_sorted_descending() {
    let source = market_fixture();
    let observations = MockObservationStore::new(vec![
        observation("agent-a", "obs-1", "BTC", 2),
        observation("agent-b", "obs-2", "BTC", -1),
        observation("agent-c", "obs-3", "ETH", 1),
    ]);
    let evaluator = RoundEvaluator::new(&source, &observations, None);

    let evaluation = evaluator.evaluate(&noon_round(), "1h", "USDT").unwrap();

    let scores: Vec<f64> = evaluation.agent_scores.iter().map(|s| s.score).collect();
    assert_eq!(scores, vec![10.0, -2.0, -5.0]);
    assert_eq!(evaluation.agent_scores[0].agent_id, "agent-a");
    assert_eq!(evaluation.agent_scores[0].observation_id, "obs-1");
    assert_eq!(evaluation.agent_scores[2].agent_id, "agent-b");
    // The returned round keeps the caller's unsnapped bounds.
    assert_eq!(evaluation.round, noon_round());
}

#[test]
fn unscoreable_observations_are_excluded_not_fatal() {
    let source = market_fixture();
    let observations = MockObservationStore::new(vec![
        observation("agent-a", "obs-1", "BTC", 2),
        Observation {
            observation_id: Some("obs-2".into()),
            agent_id: "agent-b".into(),
            event_id: "ev-2".into(),
            asset_symbol: None,
            zi_score: Some(1),
        },
        Observation {
            observation_id: Some("obs-3".into()),
            agent_id: "agent-c".into(),
            event_id: "ev-3".into(),
            asset_symbol: Some("ETH".into()),
            zi_score: None,
        },
    ]);
    let evaluator = RoundEvaluator::new(&source, &observations, None);

    let evaluation = evaluator.evaluate(&noon_round(), "1h", "USDT").unwrap();
    assert_eq!(evaluation.agent_scores.len(), 1);
    assert_eq!(evaluation.agent_scores[0].agent_id, "agent-a");
}

#[test]
fn failed_symbol_is_skipped_once_and_not_retried() {
    let source = market_fixture();
    let observations = MockObservationStore::new(vec![
        observation("agent-a", "obs-1", "DOGE", 2),
        observation("agent-b", "obs-2", "DOGE", 1),
        observation("agent-c", "obs-3", "BTC", 1),
    ]);
    let evaluator = RoundEvaluator::new(&source, &observations, None);

    let evaluation = evaluator.evaluate(&noon_round(), "1h", "USDT").unwrap();
    assert_eq!(evaluation.agent_scores.len(), 1);
    assert_eq!(evaluation.agent_scores[0].agent_id, "agent-c");
    // One failed DOGE lookup, not two.
    assert_eq!(source.refresh_calls.get(), 1);
}

#[test]
fn symbol_price_is_fetched_once_per_round() {
    let source = market_fixture();
    let observations = MockObservationStore::new(vec![
        observation("agent-a", "obs-1", "BTC", 2),
        observation("agent-b", "obs-2", "btc", -1),
    ]);
    let evaluator = RoundEvaluator::new(&source, &observations, None);

    let evaluation = evaluator.evaluate(&noon_round(), "1h", "USDT").unwrap();
    assert_eq!(evaluation.agent_scores.len(), 2);
    assert_eq!(source.fetch_calls.get(), 1);
}

#[test]
fn window_collapsing_under_snapping_is_rejected() {
    let source = market_fixture();
    let observations = MockObservationStore::new(vec![]);
    let evaluator = RoundEvaluator::new(&source, &observations, None);

    let round = Round::new("r", utc(2024, 1, 1, 12, 10), utc(2024, 1, 1, 12, 50)).unwrap();
    let err = evaluator.evaluate(&round, "1h", "USDT").unwrap_err();
    assert!(matches!(err, AgentrankError::InvalidWindow { .. }));
}

#[test]
fn future_window_is_rejected() {
    let source = market_fixture();
    let observations = MockObservationStore::new(vec![]);
    let evaluator = RoundEvaluator::new(&source, &observations, None);

    let round = Round::new("r", utc(2099, 1, 1, 12, 0), utc(2099, 1, 1, 13, 0)).unwrap();
    let err = evaluator.evaluate(&round, "1h", "USDT").unwrap_err();
    assert!(matches!(err, AgentrankError::FutureWindow { .. }));
}

#[test]
fn evaluation_is_persisted_when_a_store_is_given() {
    let source = market_fixture();
    let observations =
        MockObservationStore::new(vec![observation("agent-a", "obs-1", "BTC", 2)]);
    let store = MockRoundStore::new();
    let evaluator = RoundEvaluator::new(&source, &observations, Some(&store));

    evaluator.evaluate(&noon_round(), "1h", "USDT").unwrap();

    let saved = store.saved.borrow();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].agent_scores[0].score, 10.0);
}

#[test]
fn persistence_failure_does_not_fail_the_evaluation() {
    let source = market_fixture();
    let observations =
        MockObservationStore::new(vec![observation("agent-a", "obs-1", "BTC", 2)]);
    let store = MockRoundStore::failing();
    let evaluator = RoundEvaluator::new(&source, &observations, Some(&store));

    let evaluation = evaluator.evaluate(&noon_round(), "1h", "USDT").unwrap();
    assert_eq!(evaluation.agent_scores.len(), 1);
    assert!(store.saved.borrow().is_empty());
}

mod backfill_runs {
    use super::*;

    #[test]
    fn walks_back_consecutive_windows_and_skips_known_keys() {
        let source = market_fixture();
        let observations = MockObservationStore::new(vec![]);
        let store = MockRoundStore::with_known_keys(&["round-202401011200-202401011300"]);
        let evaluator = RoundEvaluator::new(&source, &observations, Some(&store));

        let result = backfill::run_backfill(
            &evaluator,
            &store,
            2,
            "1h",
            "USDT",
            utc(2024, 1, 1, 13, 5),
        )
        .unwrap();

        assert_eq!(result.requested, 2);
        assert_eq!(result.existing, 1);
        assert_eq!(result.processed, 1);
        assert_eq!(result.failed, 0);

        // Only the 11:00-12:00 window was evaluated.
        let saved = store.saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].round.key, "round-202401011100-202401011200");
        assert_eq!(saved[0].round.window_start, utc(2024, 1, 1, 11, 0));
        assert_eq!(saved[0].round.window_end, utc(2024, 1, 1, 12, 0));
    }

    #[test]
    fn failed_evaluations_are_counted_and_do_not_abort() {
        let source = market_fixture();
        let observations = MockObservationStore::new(vec![]);
        let store = MockRoundStore::new();
        let evaluator = RoundEvaluator::new(&source, &observations, Some(&store));

        // Both windows end in the future, so both evaluations fail.
        let result = backfill::run_backfill(
            &evaluator,
            &store,
            2,
            "1h",
            "USDT",
            utc(2099, 1, 1, 13, 5),
        )
        .unwrap();

        assert_eq!(result.processed, 2);
        assert_eq!(result.failed, 2);
        assert!(store.saved.borrow().is_empty());
    }

    #[test]
    fn zero_rounds_is_a_no_op() {
        let source = market_fixture();
        let observations = MockObservationStore::new(vec![]);
        let store = MockRoundStore::new();
        let evaluator = RoundEvaluator::new(&source, &observations, Some(&store));

        let result = backfill::run_backfill(
            &evaluator,
            &store,
            0,
            "1h",
            "USDT",
            utc(2024, 1, 1, 13, 5),
        )
        .unwrap();
        assert_eq!(result, backfill::BackfillResult::default());
        assert!(store.saved.borrow().is_empty());
    }

    #[test]
    fn bad_timeframe_fails_before_any_evaluation() {
        let source = market_fixture();
        let observations = MockObservationStore::new(vec![]);
        let store = MockRoundStore::new();
        let evaluator = RoundEvaluator::new(&source, &observations, Some(&store));

        let err = backfill::run_backfill(
            &evaluator,
            &store,
            2,
            "1x",
            "USDT",
            utc(2024, 1, 1, 13, 5),
        )
        .unwrap_err();
        assert!(matches!(err, AgentrankError::InvalidFrequency { .. }));
    }
}
