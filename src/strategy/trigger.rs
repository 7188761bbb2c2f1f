//! Two-phase trigger contract
//!
//! A trigger is armed by an initial call once its condition holds and the
//! rebalance interval has elapsed, then confirmed inside a window measured
//! from the arming time. Only a confirmation changes the target allocation.

use crate::domain::RebalanceError;

use super::params::ConfirmationWindow;

pub trait Trigger: Send + Sync {
    fn name(&self) -> String;

    /// Denominator of `target_allocation`
    fn precision(&self) -> u64;

    /// Allocation to the base asset currently in force, in `[0, precision]`
    fn target_allocation(&self) -> u64;

    fn is_armed(&self) -> bool;

    fn confirmation_window(&self) -> ConfirmationWindow;

    fn set_confirmation_window(&mut self, window: ConfirmationWindow) -> Result<(), RebalanceError>;

    fn rebalance_interval(&self) -> u64;

    fn set_rebalance_interval(&mut self, interval: u64);

    fn can_initial_trigger(&self, now: u64) -> Result<(), RebalanceError>;

    fn initial_trigger(&mut self, now: u64) -> Result<(), RebalanceError>;

    /// Allocation a confirmation at `now` would commit
    fn can_confirm_trigger(&self, now: u64) -> Result<u64, RebalanceError>;

    /// Apply a confirmation that `can_confirm_trigger(now)` already accepted.
    /// Reads no signals; a trigger that is not armed is left untouched.
    fn commit_confirmation(&mut self, now: u64);

    fn confirm_trigger(&mut self, now: u64) -> Result<u64, RebalanceError> {
        let allocation = self.can_confirm_trigger(now)?;
        self.commit_confirmation(now);
        Ok(allocation)
    }

    /// Replace per-signal weights; only weighted triggers carry any
    fn set_weights(&mut self, _weights: &[u64]) -> Result<(), RebalanceError> {
        Err(RebalanceError::InvalidInput(format!("{} has no signal weights", self.name())))
    }
}
