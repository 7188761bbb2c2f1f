//! Basket valuation
//!
//! ```text
//! value = sum(unit * price * 10^18 / (natural_unit * 10^decimals))
//! ```
//!
//! The result is the 10^18-scaled value of one whole basket token. Each
//! component term is floored on its own, so the sum never exceeds the exact
//! value.

use crate::domain::{mul_div, pow10, AssetId, Basket, BasketComponent, RebalanceError, BASKET_DECIMALS};
use crate::ports::MarketData;

/// Decimals and price of a registered asset
pub fn quote(asset: &AssetId, market: &dyn MarketData) -> Result<(u32, u128), RebalanceError> {
    let decimals = market
        .decimals(asset)
        .ok_or_else(|| RebalanceError::UnregisteredAsset(asset.to_string()))?;
    let price = market
        .price(asset)
        .ok_or_else(|| RebalanceError::UnregisteredAsset(format!("{} has no price source", asset)))?;
    Ok((decimals, price))
}

pub fn component_value(
    component: &BasketComponent,
    natural_unit: u128,
    market: &dyn MarketData,
) -> Result<u128, RebalanceError> {
    let (decimals, price) = quote(&component.asset, market)?;
    mul_div(
        &[component.unit, price, pow10(BASKET_DECIMALS)?],
        &[natural_unit, pow10(decimals)?],
    )
}

pub fn compute_value(basket: &Basket, market: &dyn MarketData) -> Result<u128, RebalanceError> {
    basket.components().iter().try_fold(0u128, |total, component| {
        let value = component_value(component, basket.natural_unit(), market)?;
        total
            .checked_add(value)
            .ok_or_else(|| RebalanceError::Overflow("basket value".to_string()))
    })
}
