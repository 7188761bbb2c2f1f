//! Auction Parameters
//!
//! Linear price curve used to hand off from the current basket to the next
//! one. Prices are quoted against `PRICE_DIVISOR`.

use serde::{Deserialize, Serialize};

use super::error::RebalanceError;
use super::fixed_point::mul_div;

/// Denominator of every auction price (a price of `PRICE_DIVISOR` is par)
pub const PRICE_DIVISOR: u128 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveDirection {
    /// Start below fair value and rise toward the pivot
    Ascending,
    /// Start above fair value and fall toward the pivot
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParameters {
    pub start_price: u128,
    pub pivot_price: u128,
    /// Seconds from auction start until the pivot price is reached
    pub time_to_pivot: u64,
    pub direction: CurveDirection,
}

impl AuctionParameters {
    /// Curve price `elapsed` seconds after the auction started.
    /// Linear from start to pivot, held at pivot afterwards. Rounds toward start.
    pub fn price_at(&self, elapsed: u64) -> Result<u128, RebalanceError> {
        if elapsed >= self.time_to_pivot || self.time_to_pivot == 0 {
            return Ok(self.pivot_price);
        }
        let elapsed = u128::from(elapsed);
        let span = u128::from(self.time_to_pivot);
        // step < range because elapsed < span
        Ok(match self.direction {
            CurveDirection::Ascending => {
                let range = self.pivot_price.saturating_sub(self.start_price);
                self.start_price + mul_div(&[range, elapsed], &[span])?
            }
            CurveDirection::Descending => {
                let range = self.start_price.saturating_sub(self.pivot_price);
                self.start_price - mul_div(&[range, elapsed], &[span])?
            }
        })
    }

    /// True when the curve never moves against its direction
    pub fn is_monotonic(&self) -> bool {
        match self.direction {
            CurveDirection::Ascending => self.start_price <= self.pivot_price,
            CurveDirection::Descending => self.start_price >= self.pivot_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascending_price_at() {
        let params = AuctionParameters {
            start_price: 900_000,
            pivot_price: 1_100_000,
            time_to_pivot: 100,
            direction: CurveDirection::Ascending,
        };
        assert_eq!(params.price_at(0).unwrap(), 900_000);
        assert_eq!(params.price_at(50).unwrap(), 1_000_000);
        assert_eq!(params.price_at(100).unwrap(), 1_100_000);
        assert_eq!(params.price_at(1_000).unwrap(), 1_100_000);
        assert!(params.is_monotonic());
    }

    #[test]
    fn test_descending_price_at() {
        let params = AuctionParameters {
            start_price: 1_100_000,
            pivot_price: 900_000,
            time_to_pivot: 200,
            direction: CurveDirection::Descending,
        };
        assert_eq!(params.price_at(0).unwrap(), 1_100_000);
        assert_eq!(params.price_at(100).unwrap(), 1_000_000);
        assert_eq!(params.price_at(250).unwrap(), 900_000);
        assert!(params.is_monotonic());
    }

    #[test]
    fn test_price_at_with_wide_range() {
        let params = AuctionParameters {
            start_price: 0,
            pivot_price: u128::MAX,
            time_to_pivot: u64::MAX,
            direction: CurveDirection::Ascending,
        };
        let elapsed = u64::MAX - 1;
        let expected = u128::MAX / u128::from(u64::MAX) * u128::from(elapsed);
        assert_eq!(params.price_at(elapsed).unwrap(), expected);
        assert_eq!(params.price_at(u64::MAX).unwrap(), u128::MAX);
    }

    #[test]
    fn test_non_monotonic_detected() {
        let params = AuctionParameters {
            start_price: 2,
            pivot_price: 1,
            time_to_pivot: 10,
            direction: CurveDirection::Ascending,
        };
        assert!(!params.is_monotonic());
    }
}
