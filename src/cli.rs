//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_observation_adapter::CsvObservationAdapter;
use crate::adapters::exchange_adapter::ExchangeAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::jsonl_round_adapter::JsonlRoundAdapter;
use crate::domain::backfill;
use crate::domain::error::AgentrankError;
use crate::domain::evaluation::RoundEvaluator;
use crate::domain::round::Round;
use crate::domain::snapshot::{self, SnapshotParams};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "agentrank", about = "Agent scoring over market price outcomes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate one round window and print its leaderboard
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        /// Round key, e.g. round-202403011200-202403011300
        #[arg(long)]
        key: String,
        /// Window start, RFC 3339
        #[arg(long)]
        start: String,
        /// Window end, RFC 3339
        #[arg(long)]
        end: String,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long)]
        quote: Option<String>,
    },
    /// Evaluate the N most recent closed round windows
    Backfill {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 10)]
        rounds: usize,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long)]
        quote: Option<String>,
    },
    /// Print an indicator snapshot for a market
    Snapshot {
        #[arg(short, long)]
        config: PathBuf,
        /// Base asset symbol, e.g. BTC
        #[arg(long)]
        symbol: String,
        /// Instant to snapshot, RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        quote: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Evaluate {
            config,
            key,
            start,
            end,
            timeframe,
            quote,
        } => run_evaluate(
            &config,
            &key,
            &start,
            &end,
            timeframe.as_deref(),
            quote.as_deref(),
        ),
        Command::Backfill {
            config,
            rounds,
            timeframe,
            quote,
        } => run_backfill(&config, rounds, timeframe.as_deref(), quote.as_deref()),
        Command::Snapshot {
            config,
            symbol,
            at,
            quote,
        } => run_snapshot(&config, &symbol, at.as_deref(), quote.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn parse_instant(value: &str, flag: &str) -> Result<DateTime<Utc>, AgentrankError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AgentrankError::InvalidArgument {
            reason: format!("--{flag}: expected RFC 3339 timestamp: {e}"),
        })
}

fn resolve_timeframe(override_tf: Option<&str>, config: &dyn ConfigPort) -> String {
    override_tf
        .map(str::to_string)
        .or_else(|| config.get_string("evaluation", "timeframe"))
        .unwrap_or_else(|| "1h".to_string())
}

fn resolve_quote(override_quote: Option<&str>, config: &dyn ConfigPort) -> String {
    override_quote
        .map(str::to_string)
        .or_else(|| config.get_string("exchange", "quote"))
        .unwrap_or_else(|| "USDT".to_string())
}

fn build_exchange(config: &dyn ConfigPort) -> Result<ExchangeAdapter, AgentrankError> {
    ExchangeAdapter::new(config.get_string("exchange", "base_url"))
}

fn build_stores(
    config: &FileConfigAdapter,
) -> Result<(CsvObservationAdapter, JsonlRoundAdapter), AgentrankError> {
    let observations_csv = config.require_string("storage", "observations_csv")?;
    let rounds_file = config.require_string("storage", "rounds_file")?;
    Ok((
        CsvObservationAdapter::new(PathBuf::from(observations_csv)),
        JsonlRoundAdapter::new(PathBuf::from(rounds_file)),
    ))
}

fn run_evaluate(
    config_path: &PathBuf,
    key: &str,
    start: &str,
    end: &str,
    timeframe: Option<&str>,
    quote: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let timeframe = resolve_timeframe(timeframe, &config);
    let quote = resolve_quote(quote, &config);

    let result = (|| -> Result<(), AgentrankError> {
        let start = parse_instant(start, "start")?;
        let end = parse_instant(end, "end")?;
        let round = Round::new(key.to_string(), start, end)?;

        let exchange = build_exchange(&config)?;
        let (observations, rounds) = build_stores(&config)?;
        let evaluator = RoundEvaluator::new(&exchange, &observations, Some(&rounds));

        eprintln!(
            "Evaluating {} [{} .. {}) on {} candles",
            round.key, round.window_start, round.window_end, timeframe
        );
        let evaluation = evaluator.evaluate(&round, &timeframe, &quote)?;

        if evaluation.agent_scores.is_empty() {
            eprintln!("No scoreable observations in window");
        }
        for s in &evaluation.agent_scores {
            println!("{}\t{}\t{:.4}", s.agent_id, s.observation_id, s.score);
        }
        eprintln!("{} scores", evaluation.agent_scores.len());
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_backfill(
    config_path: &PathBuf,
    rounds: usize,
    timeframe: Option<&str>,
    quote: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let timeframe = resolve_timeframe(timeframe, &config);
    let quote = resolve_quote(quote, &config);

    let result = (|| -> Result<(), AgentrankError> {
        let exchange = build_exchange(&config)?;
        let (observations, round_store) = build_stores(&config)?;
        let evaluator = RoundEvaluator::new(&exchange, &observations, Some(&round_store));

        eprintln!("Backfilling {rounds} x {timeframe} rounds");
        let result = backfill::run_backfill(
            &evaluator,
            &round_store,
            rounds,
            &timeframe,
            &quote,
            Utc::now(),
        )?;

        eprintln!(
            "Backfill: {} requested, {} already stored, {} processed, {} failed",
            result.requested, result.existing, result.processed, result.failed
        );
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_snapshot(
    config_path: &PathBuf,
    symbol: &str,
    at: Option<&str>,
    quote: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let quote = resolve_quote(quote, &config);

    let result = (|| -> Result<(), AgentrankError> {
        let at = match at {
            Some(v) => parse_instant(v, "at")?,
            None => Utc::now(),
        };
        let params = SnapshotParams {
            timeframe: resolve_timeframe(None, &config),
            rsi_period: config.get_int("evaluation", "rsi_period", 14) as usize,
            sma_fast: config.get_int("evaluation", "sma_fast", 50) as usize,
            sma_slow: config.get_int("evaluation", "sma_slow", 200) as usize,
        };

        let exchange = build_exchange(&config)?;
        let snap = snapshot::build_snapshot(&exchange, symbol, &quote, at, &params);
        println!("{} {}", symbol.to_uppercase(), snap.text);
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}
