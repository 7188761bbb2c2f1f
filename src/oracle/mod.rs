//! Oracle Layer - Price history and indicators
//!
//! - `series`: Fixed-capacity ring buffer fed by a single writer
//! - `moving_average`: Simple moving average reader
//! - `ema`: Exponential moving average with lazy checkpoint replay
//! - `rsi`: Relative strength index over the same history
//!
//! Every reader works on 10^18-scaled integers and rounds down.

pub mod ema;
pub mod moving_average;
pub mod rsi;
pub mod series;

pub use ema::{ema_step, EmaCheckpoint, EmaOracle};
pub use moving_average::MovingAverageOracle;
pub use rsi::{RsiOracle, RSI_SCALE};
pub use series::{
    InterpolationPolicy, PriceObservation, PriceSeriesStore, SeriesConfig, SeriesReader,
    SeriesWriter,
};

use crate::domain::RebalanceError;

/// Latest spot price of an asset
pub trait SpotPrice: Send + Sync {
    fn spot(&self) -> Result<u128, RebalanceError>;
}

/// A moving average readable over a window (SMA) or period (EMA)
pub trait MovingAverage: Send + Sync {
    fn name(&self) -> &'static str;

    fn read(&self, window: u32) -> Result<u128, RebalanceError>;
}

/// Fixed spot price, e.g. a stablecoin pegged at 1.0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPrice(pub u128);

impl SpotPrice for FixedPrice {
    fn spot(&self) -> Result<u128, RebalanceError> {
        Ok(self.0)
    }
}
