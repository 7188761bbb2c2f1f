//! Series-backed market data
//!
//! Maps each asset to its decimals and a spot price source: a live series
//! reader for the traded asset, a fixed price for a stable quote asset.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{AssetId, RebalanceError};
use crate::oracle::SpotPrice;
use crate::ports::MarketData;

struct MarketAsset {
    decimals: u32,
    source: Arc<dyn SpotPrice>,
}

#[derive(Default)]
pub struct SeriesMarket {
    assets: HashMap<AssetId, MarketAsset>,
}

impl SeriesMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        asset: AssetId,
        decimals: u32,
        source: Arc<dyn SpotPrice>,
    ) -> Result<(), RebalanceError> {
        if self.assets.contains_key(&asset) {
            return Err(RebalanceError::InvalidInput(format!("{} is already registered", asset)));
        }
        tracing::debug!("Registered {} with {} decimals", asset, decimals);
        self.assets.insert(asset, MarketAsset { decimals, source });
        Ok(())
    }
}

impl MarketData for SeriesMarket {
    fn decimals(&self, asset: &AssetId) -> Option<u32> {
        self.assets.get(asset).map(|a| a.decimals)
    }

    fn price(&self, asset: &AssetId) -> Option<u128> {
        let entry = self.assets.get(asset)?;
        match entry.source.spot() {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::warn!("No price for {}: {}", asset, e);
                None
            }
        }
    }
}
