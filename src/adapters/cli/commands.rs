//! CLI Command Handlers
//!
//! Implementation of all CLI commands for band-trader.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::replay::{PaperBroker, ReplayFeed};
use crate::application::{PairEngine, TickContext, TickOutcome};
use crate::config::{load_config, Config};
use crate::domain::Series;
use crate::strategy::{CointegrationValidator, StationarityTester, Transition};

/// band-trader - Threshold-driven position automaton for pairs and single instruments
#[derive(Parser, Debug)]
#[command(
    name = "band-trader",
    version = env!("CARGO_PKG_VERSION"),
    about = "Band automaton for spread, residual, z-score and price strategies",
    long_about = "band-trader computes a decision statistic from rolling history, derives \
                  entry/exit bands from it and drives FLAT/LONG/SHORT positions through \
                  absolute target commands, optionally gated by an Engle-Granger \
                  cointegration test."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay recorded bars through every configured pair with a paper broker
    Replay(ReplayCmd),

    /// Run the cointegration gate on two instruments from a bar file
    Coint(CointCmd),

    /// Load and validate a configuration file
    Check(CheckCmd),
}

/// Replay recorded bars
#[derive(Parser, Debug)]
pub struct ReplayCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/pairs.toml")]
    pub config: PathBuf,

    /// Bar file (overrides [replay] bars_path and BAND_TRADER_BARS)
    #[arg(short, long, value_name = "FILE")]
    pub bars: Option<PathBuf>,

    /// Contract multiplier for paper P&L
    #[arg(long, value_name = "MULT", default_value = "1.0")]
    pub multiplier: f64,
}

/// Test two instruments for cointegration
#[derive(Parser, Debug)]
pub struct CointCmd {
    /// Bar file with both instruments
    #[arg(short, long, value_name = "FILE")]
    pub bars: PathBuf,

    /// Lead instrument (regressand)
    #[arg(value_name = "LEAD")]
    pub lead: String,

    /// Hedge instrument (regressor)
    #[arg(value_name = "HEDGE")]
    pub hedge: String,

    /// Significance level for every unit-root test
    #[arg(long, value_name = "P", default_value = "0.10")]
    pub significance: f64,

    /// Lagged differences in the ADF regression
    #[arg(long, value_name = "LAG", default_value = "1")]
    pub lag: usize,

    /// Only use the most recent N aligned bars
    #[arg(short, long, value_name = "BARS")]
    pub window: Option<usize>,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct CheckCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/pairs.toml")]
    pub config: PathBuf,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    match app.command {
        Command::Replay(cmd) => {
            let config = load_config(&cmd.config)
                .with_context(|| format!("Failed to load configuration from {}", cmd.config.display()))?;
            init_logging(app.verbose, app.debug, Some(&config.logging.level))?;
            replay_command(cmd, config).await
        }
        Command::Coint(cmd) => {
            init_logging(app.verbose, app.debug, None)?;
            coint_command(cmd)
        }
        Command::Check(cmd) => {
            init_logging(app.verbose, app.debug, None)?;
            check_command(cmd)
        }
    }
}

/// Initialize logging system
///
/// `RUST_LOG` wins, then the flags, then the configured level.
pub fn init_logging(verbose: bool, debug: bool, configured: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        configured.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

/// Handle replay command
async fn replay_command(cmd: ReplayCmd, config: Config) -> Result<()> {
    let bars_path = match cmd.bars.clone().or_else(|| config.replay.get_bars_path()) {
        Some(path) => path,
        None => bail!("No bar file: pass --bars, set [replay] bars_path or BAND_TRADER_BARS"),
    };

    let feed = Arc::new(
        ReplayFeed::from_path(&bars_path)
            .with_context(|| format!("Failed to load bars from {}", bars_path.display()))?,
    );
    let broker = Arc::new(PaperBroker::new(feed.clone()).with_multiplier(cmd.multiplier));
    let automaton = config.automaton_config()?;

    let mut engines = config
        .pairs
        .iter()
        .map(|pair| {
            PairEngine::new(pair.clone(), automaton.clone(), feed.clone(), broker.clone())
                .with_context(|| format!("Failed to build engine for pair {}", pair.name))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Replaying {} pairs over {} from {}",
        engines.len(),
        feed.instruments().join(", "),
        bars_path.display()
    );

    let timestamps = feed.timestamps();
    let mut transitions = 0usize;
    let mut skipped = 0usize;
    let mut failures = 0usize;

    for (sequence, timestamp) in timestamps.iter().enumerate() {
        feed.advance_to(*timestamp);
        let ctx = TickContext::new(sequence as u64);

        for engine in engines.iter_mut() {
            match engine.on_evaluate(&ctx).await {
                Ok(TickOutcome::Skipped { .. }) => skipped += 1,
                Ok(TickOutcome::Evaluated { transition, .. }) => {
                    if !matches!(transition, Transition::Hold(_)) {
                        transitions += 1;
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!("[{}] {}: {}", engine.pair().name, timestamp, e);
                }
            }
        }
    }

    println!("Replay complete: {} bars", timestamps.len());
    println!("  Transitions:      {}", transitions);
    println!("  Skipped ticks:    {}", skipped);
    println!("  Failed ticks:     {}", failures);
    println!("  Target commands:  {}", broker.command_count().await);
    println!("  Realized P&L:     {:.2}", broker.realized_pnl().await);
    println!();

    for engine in &engines {
        println!(
            "  {:<16} {:<13} round trips today: {}",
            engine.pair().name,
            engine.state().to_string(),
            engine.round_trips_today()
        );
    }

    let holdings = broker.holdings().await;
    if holdings.is_empty() {
        println!("  No open positions");
    }
    for held in holdings {
        println!(
            "  {:<16} {:<5} {:>4} @ {:.2}",
            held.instrument, held.side, held.quantity, held.avg_price
        );
    }

    Ok(())
}

/// Handle coint command
fn coint_command(cmd: CointCmd) -> Result<()> {
    let feed = ReplayFeed::from_path(&cmd.bars)
        .with_context(|| format!("Failed to load bars from {}", cmd.bars.display()))?;
    if let Some(last) = feed.timestamps().last() {
        feed.advance_to(*last);
    }

    let closes = |instrument: &str| -> Result<Series> {
        let bars = feed
            .visible(instrument)
            .with_context(|| format!("No bars for {}", instrument))?;
        Ok(Series::closes(bars)?)
    };
    let (lead, hedge) = Series::align(&closes(&cmd.lead)?, &closes(&cmd.hedge)?);
    let (lead, hedge) = match cmd.window {
        Some(n) => (lead.trailing(n), hedge.trailing(n)),
        None => (lead, hedge),
    };

    let validator = CointegrationValidator::new(StationarityTester::new(cmd.lag), cmd.significance);
    let gate = validator
        .validate(lead.values(), hedge.values())
        .context("Cointegration test failed")?;

    println!("{} ~ {} over {} aligned bars", cmd.lead, cmd.hedge, lead.len());
    println!("  Significance: {:.2}", validator.significance());
    println!("  Valid:        {}", gate.valid);
    if let Some(rejection) = gate.rejection {
        println!("  Rejected at:  {:?}", rejection);
    }
    if let Some(p) = gate.residual_p_value {
        println!("  Residual p:   {:.4}", p);
    }
    if gate.valid {
        println!("  Hedge ratio:  {:.6}", gate.hedge_ratio);
        println!("  Intercept:    {:.6}", gate.intercept);
    }

    Ok(())
}

/// Handle check command
fn check_command(cmd: CheckCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .with_context(|| format!("Invalid configuration {}", cmd.config.display()))?;
    let automaton = config.automaton_config()?;

    println!("✓ {} is valid", cmd.config.display());
    println!(
        "  Statistic: {} ({:?}), {:?} bands, lookback {}, +{}/-{} std, recompute every {} ticks",
        automaton.statistic,
        automaton.entry_mode,
        automaton.bands.source,
        automaton.bands.lookback,
        automaton.bands.multiplier_up,
        automaton.bands.multiplier_down,
        automaton.bands.recompute_every_ticks
    );
    println!("  Validity:  {:?}", automaton.validity.policy);
    for pair in &config.pairs {
        match &pair.hedge {
            Some(hedge) => println!("  Pair {}: {} / {}", pair.name, pair.lead, hedge),
            None => println!("  Pair {}: {}", pair.name, pair.lead),
        }
    }

    Ok(())
}
