//! Price tape
//!
//! JSON list of `{timestamp, price}` points replayed into the price series.
//! Prices are human-readable strings ("151.20") scaled to 10^18 on load.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::fixed_point::to_scaled;
use crate::domain::RebalanceError;

#[derive(Debug, Error)]
pub enum TapeError {
    #[error("Failed to read tape: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse tape JSON: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid price at {timestamp}: {reason}")]
    InvalidPrice { timestamp: u64, reason: String },
    #[error("Tape not in time order at {0}")]
    OutOfOrder(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeEntry {
    pub timestamp: u64,
    pub price: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapePoint {
    pub timestamp: u64,
    /// 10^18-scaled
    pub price: u128,
}

#[derive(Debug, Clone, Default)]
pub struct PriceTape {
    points: Vec<TapePoint>,
}

impl PriceTape {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TapeError> {
        let path = shellexpand::tilde(&path.as_ref().to_string_lossy()).to_string();
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, TapeError> {
        let entries: Vec<TapeEntry> = serde_json::from_str(content)?;
        let mut points = Vec::with_capacity(entries.len());
        let mut last = 0u64;
        for entry in entries {
            if entry.timestamp < last {
                return Err(TapeError::OutOfOrder(entry.timestamp));
            }
            last = entry.timestamp;
            let price = parse(&entry).map_err(|reason| TapeError::InvalidPrice {
                timestamp: entry.timestamp,
                reason,
            })?;
            points.push(TapePoint { timestamp: entry.timestamp, price });
        }
        tracing::debug!("Loaded price tape with {} points", points.len());
        Ok(Self { points })
    }

    pub fn points(&self) -> &[TapePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn parse(entry: &TapeEntry) -> Result<u128, String> {
    let decimal = Decimal::from_str(entry.price.trim()).map_err(|e| e.to_string())?;
    let scaled = to_scaled(decimal).map_err(|e: RebalanceError| e.to_string())?;
    if scaled == 0 {
        return Err("price must be positive".to_string());
    }
    Ok(scaled)
}
