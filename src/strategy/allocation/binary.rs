//! Binary allocator
//!
//! Swaps between two pre-registered pure-exposure baskets: all base at full
//! allocation, all quote at zero. Anything in between is rejected.

use crate::domain::{Basket, RebalanceError};
use crate::ports::MarketData;

use super::Allocator;

#[derive(Debug, Clone)]
pub struct BinaryAllocator {
    base: Basket,
    quote: Basket,
}

impl BinaryAllocator {
    pub fn new(base: Basket, quote: Basket) -> Result<Self, RebalanceError> {
        if !base.is_pure() || !quote.is_pure() {
            return Err(RebalanceError::InvalidInput(
                "binary allocator needs two single-asset baskets".to_string(),
            ));
        }
        if base.components()[0].asset == quote.components()[0].asset {
            return Err(RebalanceError::InvalidInput(format!(
                "base and quote baskets both hold {}",
                base.components()[0].asset
            )));
        }
        Ok(Self { base, quote })
    }

    pub fn base(&self) -> &Basket {
        &self.base
    }

    pub fn quote(&self) -> &Basket {
        &self.quote
    }
}

impl Allocator for BinaryAllocator {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn next_basket(
        &self,
        target: u64,
        precision: u64,
        current: &Basket,
        _market: &dyn MarketData,
    ) -> Result<Basket, RebalanceError> {
        let (next, expected_current) = if target == precision {
            (&self.base, &self.quote)
        } else if target == 0 {
            (&self.quote, &self.base)
        } else {
            return Err(RebalanceError::InvalidInput(format!(
                "binary allocator cannot target {}/{}",
                target, precision
            )));
        };
        if current != expected_current {
            return Err(RebalanceError::InvariantViolation(format!(
                "current basket {} is not the opposite of next basket {}",
                current, next
            )));
        }
        Ok(next.clone())
    }
}
