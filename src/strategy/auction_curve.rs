//! Auction Curve Builder
//!
//! Prices the handoff from the current basket to the next one. Fair value is
//! the ratio of the two basket values, quoted against `PRICE_DIVISOR`; the
//! curve starts `start_pct` percent on the favourable side of fair and moves
//! linearly to `pivot_pct` percent past it over `time_to_pivot` seconds.

use serde::{Deserialize, Serialize};

use crate::domain::{mul_div, AuctionParameters, CurveDirection, RebalanceError, PRICE_DIVISOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConfig {
    pub start_pct: u64,
    pub pivot_pct: u64,
    pub time_to_pivot: u64,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            start_pct: 5,
            pivot_pct: 5,
            time_to_pivot: 6 * 3_600,
        }
    }
}

impl AuctionConfig {
    pub fn validate(&self) -> Result<(), RebalanceError> {
        if self.start_pct > 100 || self.pivot_pct > 100 {
            return Err(RebalanceError::InvalidInput(format!(
                "auction percentages must be at most 100 (start {}, pivot {})",
                self.start_pct, self.pivot_pct
            )));
        }
        if self.time_to_pivot == 0 {
            return Err(RebalanceError::InvalidInput("time to pivot must be positive".to_string()));
        }
        Ok(())
    }
}

/// Which basket the auction is paying out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Incoming {
    Next,
    Current,
}

/// Price of the incoming basket in units of the outgoing one
pub fn fair_value(old_value: u128, new_value: u128, incoming: Incoming) -> Result<u128, RebalanceError> {
    if old_value == 0 || new_value == 0 {
        return Err(RebalanceError::DivisionByZero(format!(
            "basket values must be non-zero (old {}, new {})",
            old_value, new_value
        )));
    }
    match incoming {
        Incoming::Next => mul_div(&[new_value, PRICE_DIVISOR], &[old_value]),
        Incoming::Current => mul_div(&[old_value, PRICE_DIVISOR], &[new_value]),
    }
}

/// Ascending curve for the next basket coming in
pub fn build_linear(
    old_value: u128,
    new_value: u128,
    start_pct: u64,
    pivot_pct: u64,
    time_to_pivot: u64,
) -> Result<AuctionParameters, RebalanceError> {
    AuctionCurveBuilder::new(AuctionConfig {
        start_pct,
        pivot_pct,
        time_to_pivot,
    })
    .build(old_value, new_value, Incoming::Next)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuctionCurveBuilder {
    config: AuctionConfig,
}

impl AuctionCurveBuilder {
    pub fn new(config: AuctionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> AuctionConfig {
        self.config
    }

    pub fn set_config(&mut self, config: AuctionConfig) -> Result<(), RebalanceError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn build(&self, old_value: u128, new_value: u128, incoming: Incoming) -> Result<AuctionParameters, RebalanceError> {
        let fair = fair_value(old_value, new_value, incoming)?;
        self.config.validate()?;
        if fair == 0 {
            return Err(RebalanceError::InvalidInput(format!(
                "fair value of {} against {} rounds to zero",
                new_value, old_value
            )));
        }

        let below = |pct: u64| mul_div(&[fair, u128::from(100 - pct)], &[100]);
        let above = |pct: u64| mul_div(&[fair, u128::from(100 + pct)], &[100]);

        let params = match incoming {
            Incoming::Next => AuctionParameters {
                start_price: below(self.config.start_pct)?,
                pivot_price: above(self.config.pivot_pct)?,
                time_to_pivot: self.config.time_to_pivot,
                direction: CurveDirection::Ascending,
            },
            Incoming::Current => AuctionParameters {
                start_price: above(self.config.start_pct)?,
                pivot_price: below(self.config.pivot_pct)?,
                time_to_pivot: self.config.time_to_pivot,
                direction: CurveDirection::Descending,
            },
        };

        if !params.is_monotonic() {
            return Err(RebalanceError::InvariantViolation(format!(
                "auction curve {} -> {} runs against {:?}",
                params.start_price, params.pivot_price, params.direction
            )));
        }
        tracing::debug!(
            "Auction curve {:?}: fair {} start {} pivot {} over {}s",
            params.direction,
            fair,
            params.start_price,
            params.pivot_price,
            params.time_to_pivot
        );
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PRICE_SCALE;

    #[test]
    fn test_ascending_curve() {
        let params = build_linear(150 * PRICE_SCALE, 150 * PRICE_SCALE, 5, 10, 3_600).unwrap();
        assert_eq!(params.direction, CurveDirection::Ascending);
        assert_eq!(params.start_price, 950_000);
        assert_eq!(params.pivot_price, 1_100_000);
        assert_eq!(params.time_to_pivot, 3_600);
    }

    #[test]
    fn test_descending_curve() {
        let builder = AuctionCurveBuilder::new(AuctionConfig { start_pct: 5, pivot_pct: 10, time_to_pivot: 60 });
        let params = builder.build(200, 100, Incoming::Current).unwrap();
        // fair = 200 / 100 = 2.0
        assert_eq!(params.direction, CurveDirection::Descending);
        assert_eq!(params.start_price, 2_100_000);
        assert_eq!(params.pivot_price, 1_800_000);
    }

    #[test]
    fn test_zero_values_fail_before_anything_else() {
        for other in [0u128, 1, 150 * PRICE_SCALE] {
            assert!(matches!(
                build_linear(0, other, 5, 5, 60),
                Err(RebalanceError::DivisionByZero(_))
            ));
            assert!(matches!(
                build_linear(other, 0, 500, 5, 0),
                Err(RebalanceError::DivisionByZero(_))
            ));
        }
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(build_linear(1, 1, 101, 5, 60), Err(RebalanceError::InvalidInput(_))));
        assert!(matches!(build_linear(1, 1, 5, 5, 0), Err(RebalanceError::InvalidInput(_))));
    }

    #[test]
    fn test_fair_value_rounding_to_zero() {
        assert!(matches!(
            build_linear(10_000_000, 1, 5, 5, 60),
            Err(RebalanceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_full_start_discount() {
        let params = build_linear(1, 1, 100, 0, 60).unwrap();
        assert_eq!(params.start_price, 0);
        assert_eq!(params.pivot_price, PRICE_DIVISOR);
    }

    #[test]
    fn test_prices_fall_as_old_value_rises() {
        let new_value = 150 * PRICE_SCALE;
        let mut previous: Option<AuctionParameters> = None;
        for old in (100..=200u128).step_by(7) {
            let params = build_linear(old * PRICE_SCALE, new_value, 5, 5, 60).unwrap();
            assert!(params.is_monotonic());
            if let Some(prev) = previous {
                assert!(params.start_price <= prev.start_price);
                assert!(params.pivot_price <= prev.pivot_price);
            }
            previous = Some(params);
        }
    }

    #[test]
    fn test_set_config_validates() {
        let mut builder = AuctionCurveBuilder::default();
        assert!(builder
            .set_config(AuctionConfig { start_pct: 5, pivot_pct: 5, time_to_pivot: 0 })
            .is_err());
        assert_eq!(builder.config(), AuctionConfig::default());
    }
}
