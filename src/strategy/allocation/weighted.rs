//! Weighted allocator
//!
//! Splits the current basket value between the base and quote asset so that
//! the next basket's value ratio is `t : (p - t)`, i.e.
//! `max(t/(p-t), 1) : max((p-t)/t, 1)`. Each leg's value is taken as an exact
//! fraction of the current value and converted to component units:
//!
//! ```text
//! unit = value * natural_unit * 10^decimals / (price * 10^18)
//! ```
//!
//! The natural unit starts at `10^(18 - min decimals)` and is multiplied by
//! ten while any unit floors to zero.

use serde::{Deserialize, Serialize};

use crate::domain::{mul_div, pow10, AssetId, Basket, BasketComponent, RebalanceError, BASKET_DECIMALS};
use crate::ports::MarketData;

use super::pricer::{compute_value, quote};
use super::Allocator;

pub const MAX_NATURAL_UNIT_ESCALATIONS: u32 = 10;
pub const MAX_COMPONENT_UNIT: u128 = u64::MAX as u128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedAllocator {
    base: AssetId,
    quote: AssetId,
    min_natural_unit: u128,
}

struct Leg<'a> {
    asset: &'a AssetId,
    share: u64,
    decimals: u32,
    price: u128,
}

impl WeightedAllocator {
    pub fn new(base: AssetId, quote: AssetId) -> Result<Self, RebalanceError> {
        if base == quote {
            return Err(RebalanceError::InvalidInput(format!("base and quote are both {}", base)));
        }
        Ok(Self { base, quote, min_natural_unit: 1 })
    }

    pub fn with_min_natural_unit(mut self, min_natural_unit: u128) -> Self {
        self.min_natural_unit = min_natural_unit.max(1);
        self
    }

    pub fn base(&self) -> &AssetId {
        &self.base
    }

    pub fn quote(&self) -> &AssetId {
        &self.quote
    }

    fn legs(&self, target: u64, precision: u64, market: &dyn MarketData) -> Result<Vec<Leg<'_>>, RebalanceError> {
        [(&self.base, target), (&self.quote, precision - target)]
            .into_iter()
            .filter(|&(_, share)| share > 0)
            .map(|(asset, share)| {
                let (decimals, price) = quote(asset, market)?;
                if price == 0 {
                    return Err(RebalanceError::DivisionByZero(format!("{} is priced at zero", asset)));
                }
                Ok(Leg { asset, share, decimals, price })
            })
            .collect()
    }

    fn starting_natural_unit(&self, legs: &[Leg<'_>]) -> Result<u128, RebalanceError> {
        let min_decimals = legs.iter().map(|leg| leg.decimals).min().unwrap_or(BASKET_DECIMALS);
        let natural_unit = pow10(BASKET_DECIMALS.saturating_sub(min_decimals))?;
        Ok(natural_unit.max(self.min_natural_unit))
    }
}

impl Allocator for WeightedAllocator {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn next_basket(
        &self,
        target: u64,
        precision: u64,
        current: &Basket,
        market: &dyn MarketData,
    ) -> Result<Basket, RebalanceError> {
        if precision == 0 || target > precision {
            return Err(RebalanceError::InvalidInput(format!(
                "target allocation {}/{} out of range",
                target, precision
            )));
        }
        let current_value = compute_value(current, market)?;
        if current_value == 0 {
            return Err(RebalanceError::DivisionByZero("current basket is worthless".to_string()));
        }

        let legs = self.legs(target, precision, market)?;
        let mut natural_unit = self.starting_natural_unit(&legs)?;

        for escalation in 0..=MAX_NATURAL_UNIT_ESCALATIONS {
            let mut components = Vec::with_capacity(legs.len());
            for leg in &legs {
                let unit = mul_div(
                    &[current_value, u128::from(leg.share), natural_unit, pow10(leg.decimals)?],
                    &[u128::from(precision), leg.price, pow10(BASKET_DECIMALS)?],
                )?;
                if unit > MAX_COMPONENT_UNIT {
                    return Err(RebalanceError::PrecisionExhausted {
                        escalations: escalation,
                        reason: format!("{} unit {} exceeds {}", leg.asset, unit, MAX_COMPONENT_UNIT),
                    });
                }
                components.push(BasketComponent { asset: leg.asset.clone(), unit });
            }

            if components.iter().all(|c| c.unit > 0) {
                if escalation > 0 {
                    tracing::debug!(
                        "Natural unit escalated {} times to {} for {}/{}",
                        escalation,
                        natural_unit,
                        target,
                        precision
                    );
                }
                return Basket::new(components, natural_unit);
            }

            natural_unit = match natural_unit.checked_mul(10) {
                Some(next) => next,
                None => break,
            };
        }

        tracing::warn!(
            "Allocation {}/{} of value {} cannot be expressed within {} escalations",
            target,
            precision,
            current_value,
            MAX_NATURAL_UNIT_ESCALATIONS
        );
        Err(RebalanceError::PrecisionExhausted {
            escalations: MAX_NATURAL_UNIT_ESCALATIONS,
            reason: "component units stay zero".to_string(),
        })
    }
}
