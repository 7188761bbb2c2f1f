//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/default.toml.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::application::ManagerConfig;
use crate::domain::fixed_point::to_scaled;
use crate::domain::{AssetId, Principal};
use crate::oracle::{InterpolationPolicy, SeriesConfig, RSI_SCALE};
use crate::strategy::ensemble::validate_weights;
use crate::strategy::{AuctionConfig, ConfirmationWindow, TriggerParams};

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedSection,
    pub assets: AssetsSection,
    pub trigger: TriggerSection,
    pub allocator: AllocatorSection,
    pub auction: AuctionSection,
    pub manager: ManagerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Price series configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    /// Number of stored observations
    pub capacity: usize,
    /// Expected seconds between feed updates (86400 = daily)
    pub update_interval_secs: u64,
    /// Grace period before an expected update counts as missed
    pub interpolation_threshold_secs: u64,
    /// Missed-slot fill: "hold_last" or "linear"
    #[serde(default)]
    pub policy: InterpolationPolicy,
    /// Price every slot is seeded with, in quote units ("150.25")
    pub seed_price: String,
    /// Unix timestamp of the newest seeded slot
    pub seed_timestamp: u64,
}

/// Traded pair configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsSection {
    /// Volatile asset tracked by the price feed
    pub base: String,
    pub base_decimals: u32,
    /// Stable asset priced at a fixed value
    pub quote: String,
    pub quote_decimals: u32,
    #[serde(default = "default_quote_price")]
    pub quote_price: String,
}

fn default_quote_price() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Crossover,
    Ensemble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageKind {
    Sma,
    Ema,
}

/// Trigger configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSection {
    pub kind: TriggerKind,
    pub average: AverageKind,
    /// Moving average window (SMA) or period (EMA)
    pub window: u32,
    /// Whether the tracked trend starts bullish
    #[serde(default)]
    pub initial_bullish: bool,
    pub min_confirm_delay_secs: u64,
    pub max_confirm_delay_secs: u64,
    /// Denominator of target allocations
    pub precision: u64,
    /// RSI period for the ensemble's second signal
    #[serde(default = "default_rsi_period")]
    pub rsi_period: u32,
    #[serde(default = "default_rsi_lower")]
    pub rsi_lower: String,
    #[serde(default = "default_rsi_upper")]
    pub rsi_upper: String,
    /// Ensemble weights: crossover first, RSI second
    #[serde(default)]
    pub weights: Vec<u64>,
}

fn default_rsi_period() -> u32 {
    14
}

fn default_rsi_lower() -> String {
    "30".to_string()
}

fn default_rsi_upper() -> String {
    "70".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocatorKind {
    Binary,
    Weighted,
}

/// Allocator configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct AllocatorSection {
    pub kind: AllocatorKind,
    /// Floor for the weighted allocator's starting natural unit
    #[serde(default = "default_min_natural_unit")]
    pub min_natural_unit: u64,
}

fn default_min_natural_unit() -> u64 {
    1
}

/// Auction curve configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct AuctionSection {
    /// Discount to fair value the auction opens at (percent)
    pub start_pct: u64,
    /// Premium over fair value the auction pivots at (percent)
    pub pivot_pct: u64,
    pub time_to_pivot_secs: u64,
}

/// Manager configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerSection {
    pub manager_id: String,
    pub owner: String,
    pub initializer: String,
    /// Minimum seconds between rebalances
    pub rebalance_interval_secs: u64,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "warn".to_string() }
    }
}

impl LoggingSection {
    /// Get log level with environment variable override
    /// Checks ROTOR_LOG env var first, falls back to config value
    pub fn get_level(&self) -> String {
        std::env::var("ROTOR_LOG").unwrap_or_else(|_| self.level.clone())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file; `~` in the path is expanded
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = shellexpand::tilde(&path.as_ref().to_string_lossy()).to_string();
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Parse a human-readable amount ("150.25") into a 10^18-scaled integer
pub fn parse_price(field: &str, value: &str) -> Result<u128, ConfigError> {
    let decimal = Decimal::from_str(value.trim())
        .map_err(|e| ConfigError::ValidationError(format!("{} '{}' is not a number: {}", field, value, e)))?;
    to_scaled(decimal).map_err(|e| ConfigError::ValidationError(format!("{} '{}': {}", field, value, e)))
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate feed section
        SeriesConfig::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("feed: {}", e)))?;

        if self.seed_price()? == 0 {
            return Err(ConfigError::ValidationError("seed_price must be > 0".to_string()));
        }

        // Validate assets
        if self.assets.base.is_empty() || self.assets.quote.is_empty() {
            return Err(ConfigError::ValidationError(
                "base and quote assets cannot be empty".to_string(),
            ));
        }

        if self.assets.base == self.assets.quote {
            return Err(ConfigError::ValidationError(format!(
                "base and quote must differ, both are {}",
                self.assets.base
            )));
        }

        if self.quote_price()? == 0 {
            return Err(ConfigError::ValidationError("quote_price must be > 0".to_string()));
        }

        // Validate trigger section
        if self.trigger.window == 0 || self.trigger.window as usize > self.feed.capacity {
            return Err(ConfigError::ValidationError(format!(
                "trigger window must be 1-{}, got {}",
                self.feed.capacity, self.trigger.window
            )));
        }

        TriggerParams::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("trigger: {}", e)))?;

        if self.trigger.kind == TriggerKind::Ensemble {
            if self.trigger.rsi_period == 0 || self.trigger.rsi_period as usize >= self.feed.capacity {
                return Err(ConfigError::ValidationError(format!(
                    "rsi_period must be 1-{}, got {}",
                    self.feed.capacity.saturating_sub(1),
                    self.trigger.rsi_period
                )));
            }
            let (lower, upper) = self.rsi_bounds()?;
            if lower >= upper || upper > 100 * RSI_SCALE {
                return Err(ConfigError::ValidationError(format!(
                    "rsi bounds must satisfy lower < upper <= 100, got {} / {}",
                    self.trigger.rsi_lower, self.trigger.rsi_upper
                )));
            }
            validate_weights(&self.trigger.weights, 2, self.trigger.precision).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "ensemble needs two weights summing to {}, got {:?}: {}",
                    self.trigger.precision, self.trigger.weights, e
                ))
            })?;
        }

        if self.allocator.kind == AllocatorKind::Binary && self.trigger.kind == TriggerKind::Ensemble {
            return Err(ConfigError::ValidationError(
                "binary allocator cannot follow a fractional ensemble trigger".to_string(),
            ));
        }

        // Validate auction section
        AuctionConfig::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("auction: {}", e)))?;

        // Validate manager section
        if self.manager.manager_id.is_empty() || self.manager.owner.is_empty() || self.manager.initializer.is_empty() {
            return Err(ConfigError::ValidationError(
                "manager_id, owner and initializer cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn seed_price(&self) -> Result<u128, ConfigError> {
        parse_price("seed_price", &self.feed.seed_price)
    }

    pub fn quote_price(&self) -> Result<u128, ConfigError> {
        parse_price("quote_price", &self.assets.quote_price)
    }

    /// RSI bounds scaled by `RSI_SCALE`
    pub fn rsi_bounds(&self) -> Result<(u128, u128), ConfigError> {
        Ok((
            parse_price("rsi_lower", &self.trigger.rsi_lower)?,
            parse_price("rsi_upper", &self.trigger.rsi_upper)?,
        ))
    }

    pub fn base_asset(&self) -> AssetId {
        AssetId::new(self.assets.base.clone())
    }

    pub fn quote_asset(&self) -> AssetId {
        AssetId::new(self.assets.quote.clone())
    }
}

// Conversions from Config to domain configs
impl From<&Config> for SeriesConfig {
    fn from(config: &Config) -> Self {
        SeriesConfig {
            capacity: config.feed.capacity,
            update_interval: config.feed.update_interval_secs,
            interpolation_threshold: config.feed.interpolation_threshold_secs,
            policy: config.feed.policy,
        }
    }
}

impl From<&Config> for TriggerParams {
    fn from(config: &Config) -> Self {
        TriggerParams {
            window: ConfirmationWindow {
                min_delay: config.trigger.min_confirm_delay_secs,
                max_delay: config.trigger.max_confirm_delay_secs,
            },
            rebalance_interval: config.manager.rebalance_interval_secs,
            precision: config.trigger.precision,
        }
    }
}

impl From<&Config> for AuctionConfig {
    fn from(config: &Config) -> Self {
        AuctionConfig {
            start_pct: config.auction.start_pct,
            pivot_pct: config.auction.pivot_pct,
            time_to_pivot: config.auction.time_to_pivot_secs,
        }
    }
}

impl From<&Config> for ManagerConfig {
    fn from(config: &Config) -> Self {
        ManagerConfig {
            manager_id: Principal::new(config.manager.manager_id.clone()),
            owner: Principal::new(config.manager.owner.clone()),
            initializer: Principal::new(config.manager.initializer.clone()),
            rebalance_interval: config.manager.rebalance_interval_secs,
        }
    }
}
