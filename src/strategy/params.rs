//! Strategy Parameters
//!
//! Confirmation window and cadence shared by every trigger flavour.
//! Defaults target a daily price series with a 6-12 hour confirmation window.

use serde::{Deserialize, Serialize};

use crate::domain::RebalanceError;

pub const HOUR: u64 = 3_600;
pub const DAY: u64 = 24 * HOUR;

/// Bounds, relative to the initial trigger, inside which confirmation is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationWindow {
    pub min_delay: u64,
    pub max_delay: u64,
}

impl Default for ConfirmationWindow {
    fn default() -> Self {
        Self {
            min_delay: 6 * HOUR,
            max_delay: 12 * HOUR,
        }
    }
}

impl ConfirmationWindow {
    pub fn new(min_delay: u64, max_delay: u64) -> Result<Self, RebalanceError> {
        let window = Self { min_delay, max_delay };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), RebalanceError> {
        if self.min_delay > self.max_delay {
            return Err(RebalanceError::InvariantViolation(format!(
                "confirmation window inverted: min {}s > max {}s",
                self.min_delay, self.max_delay
            )));
        }
        Ok(())
    }

    pub fn opens_at(&self, initial: u64) -> u64 {
        initial.saturating_add(self.min_delay)
    }

    pub fn closes_at(&self, initial: u64) -> u64 {
        initial.saturating_add(self.max_delay)
    }

    /// OutOfWindow unless `now` lies in `[initial + min, initial + max]`
    pub fn check(&self, initial: u64, now: u64) -> Result<(), RebalanceError> {
        let opens = self.opens_at(initial);
        let closes = self.closes_at(initial);
        if now < opens || now > closes {
            return Err(RebalanceError::OutOfWindow { now, opens, closes });
        }
        Ok(())
    }

    /// True once the window has closed for good
    pub fn has_lapsed(&self, initial: u64, now: u64) -> bool {
        now > self.closes_at(initial)
    }
}

/// Parameters common to all triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerParams {
    pub window: ConfirmationWindow,
    /// Minimum seconds between confirmed triggers
    pub rebalance_interval: u64,
    /// Denominator of every target allocation
    pub precision: u64,
}

impl Default for TriggerParams {
    fn default() -> Self {
        Self {
            window: ConfirmationWindow::default(),
            rebalance_interval: DAY,
            precision: 100,
        }
    }
}

impl TriggerParams {
    pub fn with_window(mut self, window: ConfirmationWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_rebalance_interval(mut self, interval: u64) -> Self {
        self.rebalance_interval = interval;
        self
    }

    pub fn with_precision(mut self, precision: u64) -> Self {
        self.precision = precision;
        self
    }

    pub fn validate(&self) -> Result<(), RebalanceError> {
        self.window.validate()?;
        if self.precision == 0 {
            return Err(RebalanceError::InvalidInput("allocation precision must be positive".to_string()));
        }
        Ok(())
    }

    /// Cooldown unless `rebalance_interval` has elapsed since `last`
    pub fn check_cooldown(&self, last: u64, now: u64) -> Result<(), RebalanceError> {
        let ready_at = last.saturating_add(self.rebalance_interval);
        if now < ready_at {
            return Err(RebalanceError::Cooldown { now, ready_at });
        }
        Ok(())
    }
}
