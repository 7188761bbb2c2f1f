//! Weighted Ensemble Trigger
//!
//! Combines several trend signals into a fractional allocation. Each signal
//! carries a weight and the weights sum to the allocation precision; the
//! target allocation is the summed weight of the signals confirmed bullish.
//! A neutral reading keeps that signal's previously confirmed state.

use serde::{Deserialize, Serialize};

use crate::domain::RebalanceError;

use super::params::{ConfirmationWindow, TriggerParams};
use super::signal::{Bias, TrendSignal};
use super::trigger::Trigger;

/// Snapshot taken by the initial trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleProposal {
    pub timestamp: u64,
    pub states: Vec<bool>,
    pub allocation: u64,
}

pub struct WeightedEnsembleTrigger {
    signals: Vec<Box<dyn TrendSignal>>,
    weights: Vec<u64>,
    params: TriggerParams,
    confirmed: Vec<bool>,
    proposal: Option<EnsembleProposal>,
    last_confirmed_timestamp: u64,
}

/// Weights must pair one-to-one with signals and sum exactly to `precision`
pub fn validate_weights(weights: &[u64], signal_count: usize, precision: u64) -> Result<(), RebalanceError> {
    if weights.len() != signal_count {
        return Err(RebalanceError::InvariantViolation(format!(
            "{} weights for {} signals",
            weights.len(),
            signal_count
        )));
    }
    let total = weights
        .iter()
        .try_fold(0u64, |acc, &w| acc.checked_add(w))
        .ok_or_else(|| RebalanceError::Overflow("weight sum".to_string()))?;
    if total != precision {
        return Err(RebalanceError::InvariantViolation(format!(
            "weights sum to {} instead of {}",
            total, precision
        )));
    }
    Ok(())
}

impl WeightedEnsembleTrigger {
    /// All signals start confirmed bearish
    pub fn new(members: Vec<(Box<dyn TrendSignal>, u64)>, params: TriggerParams) -> Result<Self, RebalanceError> {
        params.validate()?;
        if members.is_empty() {
            return Err(RebalanceError::InvalidInput("ensemble needs at least one signal".to_string()));
        }
        let (signals, weights): (Vec<_>, Vec<_>) = members.into_iter().unzip();
        validate_weights(&weights, signals.len(), params.precision)?;
        let confirmed = vec![false; signals.len()];
        Ok(Self {
            signals,
            weights,
            params,
            confirmed,
            proposal: None,
            last_confirmed_timestamp: 0,
        })
    }

    /// Start from a known set of confirmed states
    pub fn with_states(mut self, states: Vec<bool>) -> Result<Self, RebalanceError> {
        if states.len() != self.signals.len() {
            return Err(RebalanceError::InvalidInput(format!(
                "{} states for {} signals",
                states.len(),
                self.signals.len()
            )));
        }
        self.confirmed = states;
        Ok(self)
    }

    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    pub fn confirmed_states(&self) -> &[bool] {
        &self.confirmed
    }

    pub fn proposal(&self) -> Option<&EnsembleProposal> {
        self.proposal.as_ref()
    }

    fn live_states(&self) -> Result<Vec<bool>, RebalanceError> {
        self.signals
            .iter()
            .zip(&self.confirmed)
            .map(|(signal, &previous)| {
                Ok(match signal.bias()? {
                    Bias::Bullish => true,
                    Bias::Bearish => false,
                    Bias::Neutral => previous,
                })
            })
            .collect()
    }

    fn allocation_of(&self, states: &[bool]) -> u64 {
        self.weights
            .iter()
            .zip(states)
            .filter(|(_, bullish)| **bullish)
            .map(|(&weight, _)| weight)
            .sum()
    }

    /// Live states and allocation, failing when they match what is confirmed
    fn diverging_states(&self) -> Result<(Vec<bool>, u64), RebalanceError> {
        let states = self.live_states()?;
        let allocation = self.allocation_of(&states);
        if allocation == self.target_allocation() {
            return Err(RebalanceError::ConditionNotMet(format!(
                "live allocation {} equals confirmed allocation",
                allocation
            )));
        }
        Ok((states, allocation))
    }

    fn armed_proposal(&self) -> Result<&EnsembleProposal, RebalanceError> {
        self.proposal
            .as_ref()
            .ok_or_else(|| RebalanceError::InvalidState("ensemble trigger is not armed".to_string()))
    }
}

impl Trigger for WeightedEnsembleTrigger {
    fn name(&self) -> String {
        format!("weighted ensemble of {}", self.signals.len())
    }

    fn precision(&self) -> u64 {
        self.params.precision
    }

    fn target_allocation(&self) -> u64 {
        self.allocation_of(&self.confirmed)
    }

    fn is_armed(&self) -> bool {
        self.proposal.is_some()
    }

    fn confirmation_window(&self) -> ConfirmationWindow {
        self.params.window
    }

    fn set_confirmation_window(&mut self, window: ConfirmationWindow) -> Result<(), RebalanceError> {
        window.validate()?;
        self.params.window = window;
        Ok(())
    }

    fn rebalance_interval(&self) -> u64 {
        self.params.rebalance_interval
    }

    fn set_rebalance_interval(&mut self, interval: u64) {
        self.params.rebalance_interval = interval;
    }

    fn can_initial_trigger(&self, now: u64) -> Result<(), RebalanceError> {
        self.params.check_cooldown(self.last_confirmed_timestamp, now)?;
        self.diverging_states().map(|_| ())
    }

    fn initial_trigger(&mut self, now: u64) -> Result<(), RebalanceError> {
        self.params.check_cooldown(self.last_confirmed_timestamp, now)?;
        let (states, allocation) = self.diverging_states()?;
        tracing::info!(
            "{} armed at {}: allocation {} -> {}",
            self.name(),
            now,
            self.target_allocation(),
            allocation
        );
        self.proposal = Some(EnsembleProposal {
            timestamp: now,
            states,
            allocation,
        });
        Ok(())
    }

    fn can_confirm_trigger(&self, now: u64) -> Result<u64, RebalanceError> {
        let proposal = self.armed_proposal()?;
        self.params.window.check(proposal.timestamp, now)?;
        let states = self.live_states()?;
        let allocation = self.allocation_of(&states);
        if allocation != proposal.allocation {
            return Err(RebalanceError::ConditionNotMet(format!(
                "live allocation {} no longer matches proposed {}",
                allocation, proposal.allocation
            )));
        }
        Ok(allocation)
    }

    fn commit_confirmation(&mut self, now: u64) {
        let Some(proposal) = self.proposal.take() else {
            tracing::warn!("{} commit at {} ignored: not armed", self.name(), now);
            return;
        };
        self.confirmed = proposal.states;
        self.last_confirmed_timestamp = now;
        tracing::info!(
            "{} confirmed at {}; target allocation {}/{}",
            self.name(),
            now,
            proposal.allocation,
            self.params.precision
        );
    }

    fn set_weights(&mut self, weights: &[u64]) -> Result<(), RebalanceError> {
        validate_weights(weights, self.signals.len(), self.params.precision)?;
        self.weights = weights.to_vec();
        if self.proposal.take().is_some() {
            tracing::warn!("{} weights changed; pending proposal dropped", self.name());
        }
        Ok(())
    }
}
