//! Rotor - two-asset rotation engine
//!
//! Replays price tapes through a confirmed crossover trigger and plans
//! basket handoffs from the command line.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use rotor::adapters::cli::{self, CliApp};
use rotor::config::load_config;

fn main() -> Result<()> {
    // Load .env file if it exists (ROTOR_LOG may live there)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    // Config errors surface from the command itself
    let configured = load_config(app.command.config_path())
        .ok()
        .map(|config| config.logging.get_level());
    init_logging(app.verbose, app.debug, configured.as_deref())?;

    cli::execute(app)
}

fn init_logging(verbose: bool, debug: bool, configured: Option<&str>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        match configured {
            Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))?,
            None => EnvFilter::new("warn"),
        }
    };

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}
