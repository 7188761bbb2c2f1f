//! In-memory portfolio vehicle
//!
//! Holds the current basket, accepts one handoff at a time from its
//! registered manager and settles it on demand at the auction curve price.
//! Only the most recent `HISTORY_LIMIT` settlements are kept.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::{AuctionParameters, Basket, Principal, RebalanceError};
use crate::ports::{Clock, PortfolioVehicle};

const HISTORY_LIMIT: usize = 256;

#[derive(Debug, Clone)]
struct PendingHandoff {
    basket: Basket,
    params: AuctionParameters,
    started_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledHandoff {
    pub from: Basket,
    pub to: Basket,
    /// Curve price at settlement, against `PRICE_DIVISOR`
    pub clearing_price: u128,
    pub started_at: u64,
    pub settled_at: u64,
}

#[derive(Debug)]
struct VehicleState {
    current: Basket,
    pending: Option<PendingHandoff>,
    last_rebalance: u64,
    history: VecDeque<SettledHandoff>,
}

pub struct InMemoryVehicle {
    manager: Principal,
    clock: Arc<dyn Clock>,
    state: RwLock<VehicleState>,
}

impl InMemoryVehicle {
    pub fn new(manager: Principal, basket: Basket, clock: Arc<dyn Clock>) -> Self {
        Self {
            manager,
            clock,
            state: RwLock::new(VehicleState {
                current: basket,
                pending: None,
                last_rebalance: 0,
                history: VecDeque::with_capacity(HISTORY_LIMIT),
            }),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VehicleState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, VehicleState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settled handoffs, oldest first
    pub fn history(&self) -> Vec<SettledHandoff> {
        self.read().history.iter().cloned().collect()
    }

    /// Complete the pending handoff at the current curve price
    pub fn settle(&self) -> Result<SettledHandoff, RebalanceError> {
        let now = self.clock.now();
        let mut state = self.write();
        let clearing_price = match &state.pending {
            Some(pending) => pending.params.price_at(now.saturating_sub(pending.started_at))?,
            None => return Err(RebalanceError::InvalidState("no handoff in progress".to_string())),
        };
        let pending = state
            .pending
            .take()
            .ok_or_else(|| RebalanceError::InvalidState("no handoff in progress".to_string()))?;
        let settled = SettledHandoff {
            from: state.current.clone(),
            to: pending.basket.clone(),
            clearing_price,
            started_at: pending.started_at,
            settled_at: now,
        };
        state.current = pending.basket;
        state.last_rebalance = now;
        if state.history.len() == HISTORY_LIMIT {
            state.history.pop_front();
        }
        state.history.push_back(settled.clone());
        tracing::info!(
            "Vehicle settled {} -> {} at price {} after {}s",
            settled.from,
            settled.to,
            clearing_price,
            now.saturating_sub(settled.started_at)
        );
        Ok(settled)
    }
}

impl PortfolioVehicle for InMemoryVehicle {
    fn current_basket(&self) -> Basket {
        self.read().current.clone()
    }

    fn is_rebalancing(&self) -> bool {
        self.read().pending.is_some()
    }

    fn last_rebalance_timestamp(&self) -> u64 {
        self.read().last_rebalance
    }

    fn set_next_basket(
        &self,
        manager: &Principal,
        basket: Basket,
        params: AuctionParameters,
    ) -> Result<(), RebalanceError> {
        if manager != &self.manager {
            return Err(RebalanceError::Unauthorized(format!(
                "{} is not the vehicle's manager",
                manager
            )));
        }
        let now = self.clock.now();
        let mut state = self.write();
        if state.pending.is_some() {
            return Err(RebalanceError::InvalidState("vehicle is already rebalancing".to_string()));
        }
        tracing::info!("Vehicle handoff started at {}: {} -> {}", now, state.current, basket);
        state.pending = Some(PendingHandoff {
            basket,
            params,
            started_at: now,
        });
        Ok(())
    }
}
