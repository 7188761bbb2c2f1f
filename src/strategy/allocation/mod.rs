//! Basket allocation
//!
//! Turns a confirmed target allocation into the next basket:
//! - `BinaryAllocator`: swaps between two fixed pure-exposure baskets
//! - `WeightedAllocator`: sizes a two-asset basket to any fractional target

pub mod binary;
pub mod pricer;
pub mod weighted;

pub use binary::BinaryAllocator;
pub use pricer::{component_value, compute_value};
pub use weighted::{WeightedAllocator, MAX_COMPONENT_UNIT, MAX_NATURAL_UNIT_ESCALATIONS};

use crate::domain::{Basket, RebalanceError};
use crate::ports::MarketData;

pub trait Allocator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Basket for `target / precision` of value in the base asset
    fn next_basket(
        &self,
        target: u64,
        precision: u64,
        current: &Basket,
        market: &dyn MarketData,
    ) -> Result<Basket, RebalanceError>;
}
