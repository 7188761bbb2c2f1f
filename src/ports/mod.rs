//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - The clock every guard compares against
//! - The portfolio vehicle that owns the basket and runs the auction
//! - Asset decimals and spot prices used for valuation

pub mod clock;
pub mod market;
pub mod vehicle;

pub use clock::Clock;
pub use market::MarketData;
pub use vehicle::PortfolioVehicle;

#[cfg(test)]
pub use market::MockMarketData;
#[cfg(test)]
pub use vehicle::MockPortfolioVehicle;
