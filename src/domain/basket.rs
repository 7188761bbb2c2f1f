//! Basket
//!
//! A basket is an ordered list of `(asset, unit)` pairs plus a scaling
//! denominator, the natural unit. `unit / natural_unit` is the quantity of the
//! asset (in its base units) backing one base unit of the basket.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::RebalanceError;

/// Asset identifier (symbol or address)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketComponent {
    pub asset: AssetId,
    pub unit: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    components: Vec<BasketComponent>,
    natural_unit: u128,
}

impl Basket {
    /// Build a basket, rejecting empty, zero-unit or duplicate components
    pub fn new(components: Vec<BasketComponent>, natural_unit: u128) -> Result<Self, RebalanceError> {
        if components.is_empty() {
            return Err(RebalanceError::InvalidInput("basket has no components".to_string()));
        }
        if natural_unit == 0 {
            return Err(RebalanceError::InvalidInput("natural unit must be positive".to_string()));
        }
        for (i, component) in components.iter().enumerate() {
            if component.unit == 0 {
                return Err(RebalanceError::InvalidInput(format!(
                    "component {} has a zero unit",
                    component.asset
                )));
            }
            if components[..i].iter().any(|c| c.asset == component.asset) {
                return Err(RebalanceError::InvalidInput(format!(
                    "duplicate component {}",
                    component.asset
                )));
            }
        }
        Ok(Self { components, natural_unit })
    }

    /// Single-asset (pure exposure) basket
    pub fn single(asset: AssetId, unit: u128, natural_unit: u128) -> Result<Self, RebalanceError> {
        Self::new(vec![BasketComponent { asset, unit }], natural_unit)
    }

    pub fn components(&self) -> &[BasketComponent] {
        &self.components
    }

    pub fn natural_unit(&self) -> u128 {
        self.natural_unit
    }

    pub fn unit_of(&self, asset: &AssetId) -> Option<u128> {
        self.components
            .iter()
            .find(|c| &c.asset == asset)
            .map(|c| c.unit)
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.components.iter().map(|c| &c.asset)
    }

    /// True when the basket holds exactly one asset
    pub fn is_pure(&self) -> bool {
        self.components.len() == 1
    }
}

impl fmt::Display for Basket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| format!("{}:{}", c.asset, c.unit))
            .collect();
        write!(f, "[{}]/{}", parts.join(", "), self.natural_unit)
    }
}
