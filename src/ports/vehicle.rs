//! Portfolio Vehicle Port
//!
//! The external owner of the managed basket and of the handoff auction. The
//! manager polls it on every call and never caches its rebalancing status.

use crate::domain::{AuctionParameters, Basket, Principal, RebalanceError};

#[cfg_attr(test, mockall::automock)]
pub trait PortfolioVehicle: Send + Sync {
    /// Basket currently backing the vehicle
    fn current_basket(&self) -> Basket;

    /// True while a handoff auction is in progress
    fn is_rebalancing(&self) -> bool;

    /// Unix timestamp at which the last handoff completed
    fn last_rebalance_timestamp(&self) -> u64;

    /// Start a handoff to `basket` priced by `params`.
    ///
    /// Fails `Unauthorized` unless `manager` is the registered manager and
    /// `InvalidState` unless the vehicle is idle.
    fn set_next_basket(
        &self,
        manager: &Principal,
        basket: Basket,
        params: AuctionParameters,
    ) -> Result<(), RebalanceError>;
}
