//! Crossover Trigger
//!
//! Tracks one bullish/bearish direction and flips it when its signal reads
//! the opposite way twice: once to arm, once inside the confirmation window.
//! A bullish direction targets the whole allocation to the base asset.

use serde::{Deserialize, Serialize};

use crate::domain::RebalanceError;

use super::params::{ConfirmationWindow, TriggerParams};
use super::signal::{Bias, TrendSignal};
use super::trigger::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverState {
    pub last_initial_timestamp: u64,
    pub armed: bool,
    pub bullish: bool,
    pub last_confirmed_timestamp: u64,
}

pub struct CrossoverTrigger {
    signal: Box<dyn TrendSignal>,
    params: TriggerParams,
    state: CrossoverState,
}

impl CrossoverTrigger {
    pub fn new(signal: Box<dyn TrendSignal>, params: TriggerParams, bullish: bool) -> Result<Self, RebalanceError> {
        params.validate()?;
        Ok(Self {
            signal,
            params,
            state: CrossoverState {
                last_initial_timestamp: 0,
                armed: false,
                bullish,
                last_confirmed_timestamp: 0,
            },
        })
    }

    pub fn state(&self) -> CrossoverState {
        self.state
    }

    pub fn is_bullish(&self) -> bool {
        self.state.bullish
    }

    /// The signal must read against the tracked direction; neutral never flips it
    fn check_condition(&self) -> Result<(), RebalanceError> {
        let wanted = Bias::from_bullish(!self.state.bullish);
        let bias = self.signal.bias()?;
        if bias != wanted {
            return Err(RebalanceError::ConditionNotMet(format!(
                "{} reads {} while tracking {}",
                self.signal.name(),
                bias,
                Bias::from_bullish(self.state.bullish)
            )));
        }
        Ok(())
    }

    fn allocation_for(&self, bullish: bool) -> u64 {
        if bullish {
            self.params.precision
        } else {
            0
        }
    }
}

impl Trigger for CrossoverTrigger {
    fn name(&self) -> String {
        self.signal.name()
    }

    fn precision(&self) -> u64 {
        self.params.precision
    }

    fn target_allocation(&self) -> u64 {
        self.allocation_for(self.state.bullish)
    }

    fn is_armed(&self) -> bool {
        self.state.armed
    }

    fn confirmation_window(&self) -> ConfirmationWindow {
        self.params.window
    }

    fn set_confirmation_window(&mut self, window: ConfirmationWindow) -> Result<(), RebalanceError> {
        window.validate()?;
        self.params.window = window;
        tracing::info!(
            "{} confirmation window set to [{}s, {}s]",
            self.name(),
            window.min_delay,
            window.max_delay
        );
        Ok(())
    }

    fn rebalance_interval(&self) -> u64 {
        self.params.rebalance_interval
    }

    fn set_rebalance_interval(&mut self, interval: u64) {
        self.params.rebalance_interval = interval;
    }

    fn can_initial_trigger(&self, now: u64) -> Result<(), RebalanceError> {
        self.params.check_cooldown(self.state.last_confirmed_timestamp, now)?;
        self.check_condition()
    }

    fn initial_trigger(&mut self, now: u64) -> Result<(), RebalanceError> {
        self.can_initial_trigger(now)?;
        if self.state.armed {
            tracing::info!("{} re-armed, window restarts at {}", self.name(), now);
        }
        self.state.armed = true;
        self.state.last_initial_timestamp = now;
        tracing::info!(
            "{} armed at {}; confirm within [{}, {}]",
            self.name(),
            now,
            self.params.window.opens_at(now),
            self.params.window.closes_at(now)
        );
        Ok(())
    }

    fn can_confirm_trigger(&self, now: u64) -> Result<u64, RebalanceError> {
        if !self.state.armed {
            return Err(RebalanceError::InvalidState(format!("{} is not armed", self.name())));
        }
        self.params.window.check(self.state.last_initial_timestamp, now)?;
        self.check_condition()?;
        Ok(self.allocation_for(!self.state.bullish))
    }

    fn commit_confirmation(&mut self, now: u64) {
        if !self.state.armed {
            tracing::warn!("{} commit at {} ignored: not armed", self.name(), now);
            return;
        }
        self.state.bullish = !self.state.bullish;
        self.state.armed = false;
        self.state.last_confirmed_timestamp = now;
        tracing::info!(
            "{} confirmed {} at {}; target allocation {}/{}",
            self.name(),
            Bias::from_bullish(self.state.bullish),
            now,
            self.allocation_for(self.state.bullish),
            self.params.precision
        );
    }
}
