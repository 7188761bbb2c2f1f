//! Access Control
//!
//! Owner gating for the administrative surface and the one-shot initializer
//! capability consumed when a manager is first bound to a vehicle.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::RebalanceError;

/// Identity of a caller (operator key, service name, manager id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGuard {
    owner: Principal,
}

impl AccessGuard {
    pub fn new(owner: Principal) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn ensure_owner(&self, caller: &Principal) -> Result<(), RebalanceError> {
        if caller != &self.owner {
            return Err(RebalanceError::Unauthorized(format!(
                "{} is not the owner",
                caller
            )));
        }
        Ok(())
    }

    pub fn transfer(&mut self, caller: &Principal, new_owner: Principal) -> Result<(), RebalanceError> {
        self.ensure_owner(caller)?;
        tracing::info!("Ownership transferred from {} to {}", self.owner, new_owner);
        self.owner = new_owner;
        Ok(())
    }
}

/// Capability that can be exercised exactly once by its holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShot {
    holder: Option<Principal>,
}

impl OneShot {
    pub fn new(holder: Principal) -> Self {
        Self { holder: Some(holder) }
    }

    pub fn is_consumed(&self) -> bool {
        self.holder.is_none()
    }

    /// Check without consuming
    pub fn ensure_holder(&self, caller: &Principal) -> Result<(), RebalanceError> {
        match &self.holder {
            None => Err(RebalanceError::Unauthorized(
                "initializer capability already consumed".to_string(),
            )),
            Some(holder) if holder != caller => Err(RebalanceError::Unauthorized(format!(
                "{} is not the initializer",
                caller
            ))),
            Some(_) => Ok(()),
        }
    }

    pub fn consume(&mut self, caller: &Principal) -> Result<(), RebalanceError> {
        self.ensure_holder(caller)?;
        self.holder = None;
        Ok(())
    }
}
