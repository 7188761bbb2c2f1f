//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the rotor engine.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::{ManualClock, PriceTape, SeriesMarket, SystemClock};
use crate::application::engine::{build_allocator, pure_baskets};
use crate::application::{plan_rebalance, Engine, SimulationEvent};
use crate::config::{load_config, parse_price, Config};
use crate::domain::fixed_point::from_scaled;
use crate::oracle::FixedPrice;
use crate::ports::Clock;
use crate::strategy::{AuctionConfig, AuctionCurveBuilder, HOUR};

/// Rotor - two-asset rotation engine
#[derive(Parser, Debug)]
#[command(
    name = "rotor",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Two-asset rotation engine with confirmed crossover triggers",
    long_about = "Rotor watches a price series, arms a trigger when the trend turns, \
                  confirms it inside a time window and computes the next basket and \
                  the auction curve that hands the portfolio over to it."
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
    /// Check a configuration file
    Validate(ValidateCmd),

    /// Replay a price tape through the full engine
    Simulate(SimulateCmd),

    /// Compute the next basket and auction curve for given prices
    Plan(PlanCmd),
}

impl Command {
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Validate(cmd) => &cmd.config,
            Command::Simulate(cmd) => &cmd.config,
            Command::Plan(cmd) => &cmd.config,
        }
    }
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct ValidateCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}

/// Replay a price tape
#[derive(Parser, Debug)]
pub struct SimulateCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// JSON price tape: [{"timestamp": 1700086400, "price": "151.20"}, ...]
    #[arg(short, long, value_name = "FILE")]
    pub tape: PathBuf,

    /// Hours between proposing and confirming a rebalance
    #[arg(long, value_name = "HOURS", default_value = "7")]
    pub confirm_after_hours: u64,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Which pure basket the vehicle currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Holding {
    Base,
    Quote,
}

/// Plan a rebalance
#[derive(Parser, Debug)]
pub struct PlanCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Base asset price in quote units (e.g. 151.20)
    #[arg(long, value_name = "PRICE")]
    pub base_price: String,

    /// Quote asset price (defaults to the configured one)
    #[arg(long, value_name = "PRICE")]
    pub quote_price: Option<String>,

    /// Target allocation to the base asset, out of the configured precision
    #[arg(long, value_name = "ALLOCATION")]
    pub target: u64,

    /// Basket currently held
    #[arg(long, value_enum, default_value = "base")]
    pub from: Holding,
}

/// Execute the parsed command
pub fn execute(app: CliApp) -> Result<()> {
    match app.command {
        Command::Validate(cmd) => validate_command(cmd),
        Command::Simulate(cmd) => simulate_command(cmd),
        Command::Plan(cmd) => plan_command(cmd),
    }
}

fn load(path: &Path) -> Result<Config> {
    load_config(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn validate_command(cmd: ValidateCmd) -> Result<()> {
    let config = load(&cmd.config)?;

    println!("Configuration OK: {}", cmd.config.display());
    println!("  Pair:      {}/{}", config.assets.base, config.assets.quote);
    println!(
        "  Feed:      {} slots every {}s, seeded at {}",
        config.feed.capacity, config.feed.update_interval_secs, config.feed.seed_price
    );
    println!(
        "  Trigger:   {:?} on {:?}({}), confirm within [{}s, {}s]",
        config.trigger.kind,
        config.trigger.average,
        config.trigger.window,
        config.trigger.min_confirm_delay_secs,
        config.trigger.max_confirm_delay_secs
    );
    println!("  Allocator: {:?}", config.allocator.kind);
    println!(
        "  Auction:   start -{}%, pivot +{}% after {}s",
        config.auction.start_pct, config.auction.pivot_pct, config.auction.time_to_pivot_secs
    );
    Ok(())
}

fn simulate_command(cmd: SimulateCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let tape = PriceTape::load(&cmd.tape)
        .with_context(|| format!("Failed to load price tape from {}", cmd.tape.display()))?;
    if tape.is_empty() {
        bail!("Price tape {} has no points", cmd.tape.display());
    }

    let clock = Arc::new(ManualClock::new(config.feed.seed_timestamp));
    let mut engine = Engine::build(&config, clock.clone()).context("Failed to assemble engine")?;

    tracing::info!("Replaying {} price points", tape.len());
    let events = engine.replay(&tape, &clock, cmd.confirm_after_hours * HOUR);

    for event in &events {
        if cmd.json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            print_event(event);
        }
    }

    let status = engine.manager.status();
    let rebalances = events
        .iter()
        .filter(|e| matches!(e, SimulationEvent::Rebalanced { .. }))
        .count();
    if cmd.json {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        println!(
            "Replayed {} points: {} rebalances, final allocation {}/{}",
            tape.len(),
            rebalances,
            status.target_allocation,
            status.precision
        );
    }
    Ok(())
}

fn print_event(event: &SimulationEvent) {
    match event {
        SimulationEvent::Proposed { timestamp } => println!("[{}] proposed", timestamp),
        SimulationEvent::Rebalanced { outcome } => println!(
            "[{}] rebalanced to {}/{}: {} (auction {} -> {})",
            outcome.timestamp,
            outcome.target_allocation,
            outcome.precision,
            outcome.basket,
            outcome.auction.start_price,
            outcome.auction.pivot_price
        ),
        SimulationEvent::Rejected { timestamp, reason } => println!("[{}] confirmation rejected: {}", timestamp, reason),
        SimulationEvent::Settled { handoff } => println!(
            "[{}] settled {} -> {} at {}",
            handoff.settled_at, handoff.from, handoff.to, handoff.clearing_price
        ),
        SimulationEvent::Skipped { timestamp, reason } => println!("[{}] skipped: {}", timestamp, reason),
    }
}

fn plan_command(cmd: PlanCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    if cmd.target > config.trigger.precision {
        bail!(
            "Target {} exceeds allocation precision {}",
            cmd.target,
            config.trigger.precision
        );
    }

    let base_price = parse_price("base-price", &cmd.base_price)?;
    let quote_price = match &cmd.quote_price {
        Some(price) => parse_price("quote-price", price)?,
        None => config.quote_price()?,
    };

    let mut market = SeriesMarket::new();
    market.register(config.base_asset(), config.assets.base_decimals, Arc::new(FixedPrice(base_price)))?;
    market.register(config.quote_asset(), config.assets.quote_decimals, Arc::new(FixedPrice(quote_price)))?;

    let baskets = pure_baskets(&config, &market)?;
    let allocator = build_allocator(&config, &baskets)?;
    let current = match cmd.from {
        Holding::Base => &baskets.base,
        Holding::Quote => &baskets.quote,
    };
    let auction = AuctionCurveBuilder::new(AuctionConfig::from(&config));

    let outcome = plan_rebalance(
        allocator.as_ref(),
        &auction,
        &market,
        current,
        cmd.target,
        config.trigger.precision,
        SystemClock.now(),
    )
    .context("Failed to plan rebalance")?;

    tracing::info!(
        "Planned {}/{} at {} per {}: value {}",
        cmd.target,
        config.trigger.precision,
        from_scaled(base_price)?,
        config.assets.base,
        from_scaled(outcome.next_value)?
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
