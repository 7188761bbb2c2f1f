//! Adapters Layer - Port Implementations
//!
//! This module contains implementations of the port traits:
//! - Clock: system wall time and a manually driven clock
//! - Market: asset registry backed by price series and fixed prices
//! - Vehicle: in-memory portfolio vehicle that settles handoff auctions
//! - Price tape: JSON price histories for replay
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod clock;
pub mod market;
pub mod price_tape;
pub mod vehicle;

pub use cli::CliApp;
pub use clock::{ManualClock, SystemClock};
pub use market::SeriesMarket;
pub use price_tape::{PriceTape, TapeError, TapePoint};
pub use vehicle::{InMemoryVehicle, SettledHandoff};
