//! Rebalance Strategy Manager
//!
//! Coordinates one trigger, one allocator and the auction curve against a
//! portfolio vehicle. A rebalance takes two calls: `initial_propose` arms the
//! trigger, `confirm_propose` (inside the confirmation window) computes the
//! next basket and hands it to the vehicle together with its auction curve.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{AccessGuard, AuctionParameters, Basket, OneShot, Principal, RebalanceError};
use crate::ports::{Clock, MarketData, PortfolioVehicle};
use crate::strategy::{
    compute_value, Allocator, AuctionConfig, AuctionCurveBuilder, ConfirmationWindow, Incoming, Trigger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerPhase {
    Default,
    Proposed,
}

/// Identities and cadence of a manager instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Identity presented to the vehicle
    pub manager_id: Principal,
    pub owner: Principal,
    /// Holder of the one-time `initialize` capability
    pub initializer: Principal,
    /// Minimum seconds between vehicle handoffs
    pub rebalance_interval: u64,
}

/// Everything decided by a confirmed rebalance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    pub basket: Basket,
    pub auction: AuctionParameters,
    pub target_allocation: u64,
    pub precision: u64,
    pub current_value: u128,
    pub next_value: u128,
    pub timestamp: u64,
}

/// Status snapshot of the manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStatus {
    pub now: u64,
    pub phase: ManagerPhase,
    pub proposal_timestamp: Option<u64>,
    pub initialized: bool,
    pub vehicle_rebalancing: Option<bool>,
    pub trigger: String,
    pub trigger_armed: bool,
    pub target_allocation: u64,
    pub precision: u64,
    pub allocator: String,
}

/// Next basket and handoff auction for `target / precision` of value in the base asset
pub fn plan_rebalance(
    allocator: &dyn Allocator,
    auction: &AuctionCurveBuilder,
    market: &dyn MarketData,
    current: &Basket,
    target: u64,
    precision: u64,
    now: u64,
) -> Result<RebalanceOutcome, RebalanceError> {
    let basket = allocator.next_basket(target, precision, current, market)?;
    let current_value = compute_value(current, market)?;
    let next_value = compute_value(&basket, market)?;
    let auction = auction.build(current_value, next_value, Incoming::Next)?;
    Ok(RebalanceOutcome {
        basket,
        auction,
        target_allocation: target,
        precision,
        current_value,
        next_value,
        timestamp: now,
    })
}

pub struct RebalanceStrategyManager {
    id: Principal,
    trigger: Box<dyn Trigger>,
    allocator: Box<dyn Allocator>,
    auction: AuctionCurveBuilder,
    vehicle: Option<Arc<dyn PortfolioVehicle>>,
    market: Arc<dyn MarketData>,
    clock: Arc<dyn Clock>,
    access: AccessGuard,
    initializer: OneShot,
    rebalance_interval: u64,
    phase: ManagerPhase,
    proposal_timestamp: u64,
}

impl RebalanceStrategyManager {
    pub fn new(
        config: ManagerConfig,
        trigger: Box<dyn Trigger>,
        allocator: Box<dyn Allocator>,
        auction: AuctionCurveBuilder,
        market: Arc<dyn MarketData>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        tracing::info!(
            "Manager {} using trigger '{}' and {} allocator",
            config.manager_id,
            trigger.name(),
            allocator.name()
        );
        Self {
            id: config.manager_id,
            trigger,
            allocator,
            auction,
            vehicle: None,
            market,
            clock,
            access: AccessGuard::new(config.owner),
            initializer: OneShot::new(config.initializer),
            rebalance_interval: config.rebalance_interval,
            phase: ManagerPhase::Default,
            proposal_timestamp: 0,
        }
    }

    pub fn id(&self) -> &Principal {
        &self.id
    }

    pub fn trigger(&self) -> &dyn Trigger {
        self.trigger.as_ref()
    }

    pub fn rebalance_interval(&self) -> u64 {
        self.rebalance_interval
    }

    /// Bind the vehicle; usable once, by the initializer only
    pub fn initialize(&mut self, caller: &Principal, vehicle: Arc<dyn PortfolioVehicle>) -> Result<(), RebalanceError> {
        self.initializer.consume(caller)?;
        tracing::info!("Manager {} bound to vehicle holding {}", self.id, vehicle.current_basket());
        self.vehicle = Some(vehicle);
        Ok(())
    }

    /// Phase as seen at `now`: a proposal whose window has closed counts as cancelled
    pub fn effective_phase(&self, now: u64) -> ManagerPhase {
        match self.phase {
            ManagerPhase::Proposed
                if self
                    .trigger
                    .confirmation_window()
                    .has_lapsed(self.proposal_timestamp, now) =>
            {
                ManagerPhase::Default
            }
            phase => phase,
        }
    }

    fn vehicle(&self) -> Result<Arc<dyn PortfolioVehicle>, RebalanceError> {
        self.vehicle
            .clone()
            .ok_or_else(|| RebalanceError::InvalidState(format!("manager {} is not initialized", self.id)))
    }

    fn check_initial_guards(&self, now: u64) -> Result<(), RebalanceError> {
        let vehicle = self.vehicle()?;
        if self.effective_phase(now) != ManagerPhase::Default {
            return Err(RebalanceError::InvalidState(format!(
                "proposal from {} still awaiting confirmation",
                self.proposal_timestamp
            )));
        }
        if vehicle.is_rebalancing() {
            return Err(RebalanceError::InvalidState("vehicle is rebalancing".to_string()));
        }
        let ready_at = vehicle
            .last_rebalance_timestamp()
            .saturating_add(self.rebalance_interval);
        if now < ready_at {
            return Err(RebalanceError::Cooldown { now, ready_at });
        }
        Ok(())
    }

    fn check_confirm_guards(&self) -> Result<Arc<dyn PortfolioVehicle>, RebalanceError> {
        let vehicle = self.vehicle()?;
        if self.phase != ManagerPhase::Proposed {
            return Err(RebalanceError::InvalidState("no proposal to confirm".to_string()));
        }
        if vehicle.is_rebalancing() {
            return Err(RebalanceError::InvalidState("vehicle is rebalancing".to_string()));
        }
        Ok(vehicle)
    }

    fn plan(&self, target: u64, vehicle: &dyn PortfolioVehicle, now: u64) -> Result<RebalanceOutcome, RebalanceError> {
        plan_rebalance(
            self.allocator.as_ref(),
            &self.auction,
            self.market.as_ref(),
            &vehicle.current_basket(),
            target,
            self.trigger.precision(),
            now,
        )
    }

    pub fn can_initial_propose(&self) -> Result<(), RebalanceError> {
        let now = self.clock.now();
        self.check_initial_guards(now)?;
        self.trigger.can_initial_trigger(now)
    }

    pub fn initial_propose(&mut self) -> Result<(), RebalanceError> {
        let now = self.clock.now();
        self.check_initial_guards(now)?;
        self.trigger.initial_trigger(now)?;
        if self.phase == ManagerPhase::Proposed {
            tracing::info!("Lapsed proposal from {} replaced", self.proposal_timestamp);
        }
        self.phase = ManagerPhase::Proposed;
        self.proposal_timestamp = now;
        let window = self.trigger.confirmation_window();
        tracing::info!(
            "Proposal at {}: confirm between {} and {}",
            now,
            window.opens_at(now),
            window.closes_at(now)
        );
        Ok(())
    }

    /// Outcome a confirmation right now would produce, without side effects
    pub fn preview_confirm(&self) -> Result<RebalanceOutcome, RebalanceError> {
        let now = self.clock.now();
        let vehicle = self.check_confirm_guards()?;
        let target = self.trigger.can_confirm_trigger(now)?;
        self.plan(target, vehicle.as_ref(), now)
    }

    pub fn can_confirm_propose(&self) -> Result<(), RebalanceError> {
        self.preview_confirm().map(|_| ())
    }

    pub fn confirm_propose(&mut self) -> Result<RebalanceOutcome, RebalanceError> {
        let now = self.clock.now();
        let vehicle = self.check_confirm_guards()?;
        let target = self.trigger.can_confirm_trigger(now)?;
        let outcome = self.plan(target, vehicle.as_ref(), now)?;

        vehicle.set_next_basket(&self.id, outcome.basket.clone(), outcome.auction)?;
        // The vehicle holds the new basket; commit without re-reading signals
        self.trigger.commit_confirmation(now);
        self.phase = ManagerPhase::Default;

        tracing::info!(
            "Rebalance confirmed at {}: allocation {}/{} -> {} (value {} -> {}, auction {} -> {})",
            now,
            outcome.target_allocation,
            outcome.precision,
            outcome.basket,
            outcome.current_value,
            outcome.next_value,
            outcome.auction.start_price,
            outcome.auction.pivot_price
        );
        Ok(outcome)
    }

    pub fn set_rebalance_interval(&mut self, caller: &Principal, interval: u64) -> Result<(), RebalanceError> {
        self.access.ensure_owner(caller)?;
        self.rebalance_interval = interval;
        self.trigger.set_rebalance_interval(interval);
        tracing::info!("Rebalance interval set to {}s", interval);
        Ok(())
    }

    pub fn set_confirmation_window(
        &mut self,
        caller: &Principal,
        min_delay: u64,
        max_delay: u64,
    ) -> Result<(), RebalanceError> {
        self.access.ensure_owner(caller)?;
        self.trigger
            .set_confirmation_window(ConfirmationWindow { min_delay, max_delay })
    }

    pub fn set_trigger_weights(&mut self, caller: &Principal, weights: &[u64]) -> Result<(), RebalanceError> {
        self.access.ensure_owner(caller)?;
        self.trigger.set_weights(weights)?;
        tracing::info!("Trigger weights set to {:?}", weights);
        Ok(())
    }

    pub fn set_auction_config(&mut self, caller: &Principal, config: AuctionConfig) -> Result<(), RebalanceError> {
        self.access.ensure_owner(caller)?;
        self.auction.set_config(config)?;
        tracing::info!(
            "Auction config set: start {}%, pivot {}%, {}s to pivot",
            config.start_pct,
            config.pivot_pct,
            config.time_to_pivot
        );
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Principal, new_owner: Principal) -> Result<(), RebalanceError> {
        self.access.transfer(caller, new_owner)
    }

    pub fn status(&self) -> ManagerStatus {
        let now = self.clock.now();
        let phase = self.effective_phase(now);
        ManagerStatus {
            now,
            phase,
            proposal_timestamp: (phase == ManagerPhase::Proposed).then_some(self.proposal_timestamp),
            initialized: self.vehicle.is_some(),
            vehicle_rebalancing: self.vehicle.as_ref().map(|v| v.is_rebalancing()),
            trigger: self.trigger.name(),
            trigger_armed: self.trigger.is_armed(),
            target_allocation: self.trigger.target_allocation(),
            precision: self.trigger.precision(),
            allocator: self.allocator.name().to_string(),
        }
    }
}
