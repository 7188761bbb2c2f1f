//! Rebalance Error Taxonomy
//!
//! Every fallible engine operation returns `RebalanceError`. Failures are
//! local and synchronous; nothing is retried on the caller's behalf.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RebalanceError {
    /// Wrong state-machine phase or vehicle busy
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Confirmation called too early or too late
    #[error("Outside confirmation window: now {now}, window [{opens}, {closes}]")]
    OutOfWindow { now: u64, opens: u64, closes: u64 },

    /// Underlying trigger condition does not hold
    #[error("Trigger condition not met: {0}")]
    ConditionNotMet(String),

    /// Natural-unit escalation did not converge
    #[error("Precision exhausted after {escalations} escalations: {reason}")]
    PrecisionExhausted { escalations: u32, reason: String },

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    /// Asset has no price source or no registered decimals
    #[error("Unregistered asset: {0}")]
    UnregisteredAsset(String),

    #[error("Unauthorized caller: {0}")]
    Unauthorized(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid range: {value} not in [{min}, {max}]")]
    InvalidRange { value: u64, min: u64, max: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Interval since the last action has not elapsed
    #[error("Cooldown active: now {now}, ready at {ready_at}")]
    Cooldown { now: u64, ready_at: u64 },

    #[error("EMA series for period {0} is already registered")]
    AlreadyRegistered(u32),

    #[error("EMA series for period {0} is not registered")]
    NotRegistered(u32),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

impl RebalanceError {
    /// Short machine-friendly tag used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "invalid_state",
            Self::OutOfWindow { .. } => "out_of_window",
            Self::ConditionNotMet(_) => "condition_not_met",
            Self::PrecisionExhausted { .. } => "precision_exhausted",
            Self::DivisionByZero(_) => "division_by_zero",
            Self::UnregisteredAsset(_) => "unregistered_asset",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InvalidRange { .. } => "invalid_range",
            Self::InvalidInput(_) => "invalid_input",
            Self::Cooldown { .. } => "cooldown",
            Self::AlreadyRegistered(_) => "already_registered",
            Self::NotRegistered(_) => "not_registered",
            Self::Overflow(_) => "overflow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RebalanceError::OutOfWindow { now: 10, opens: 20, closes: 30 };
        assert_eq!(err.to_string(), "Outside confirmation window: now 10, window [20, 30]");

        let err = RebalanceError::Cooldown { now: 5, ready_at: 9 };
        assert_eq!(err.to_string(), "Cooldown active: now 5, ready at 9");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(RebalanceError::AlreadyRegistered(26).kind(), "already_registered");
        assert_eq!(
            RebalanceError::InvalidRange { value: 0, min: 1, max: 20 }.kind(),
            "invalid_range"
        );
    }
}
