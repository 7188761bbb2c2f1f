//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, parse_price, AllocatorKind, AverageKind, Config, ConfigError, TriggerKind,
};
