//! Market Data Port
//!
//! Asset registry (decimals) and spot price lookup used to value baskets.

use crate::domain::AssetId;

#[cfg_attr(test, mockall::automock)]
pub trait MarketData: Send + Sync {
    /// Decimal precision of the asset's base unit, if registered
    fn decimals(&self, asset: &AssetId) -> Option<u32>;

    /// 10^18-scaled price of one whole token, if a price source exists
    fn price(&self, asset: &AssetId) -> Option<u128>;
}
