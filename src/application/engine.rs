//! Engine assembly and replay
//!
//! Wires a price series, market, trigger, allocator, in-memory vehicle and
//! manager together from a `Config`, and replays price tapes through them.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::adapters::{InMemoryVehicle, ManualClock, PriceTape, SeriesMarket, SettledHandoff};
use crate::config::{AllocatorKind, AverageKind, Config, ConfigError, TriggerKind};
use crate::domain::{pow10, Basket, Principal, RebalanceError, PRICE_SCALE};
use crate::oracle::{
    EmaOracle, FixedPrice, MovingAverage, MovingAverageOracle, PriceSeriesStore, RsiOracle, SeriesConfig,
    SeriesReader, SeriesWriter,
};
use crate::ports::{Clock, MarketData, PortfolioVehicle};
use crate::strategy::{
    Allocator, AuctionConfig, AuctionCurveBuilder, BinaryAllocator, CrossoverTrigger, MovingAverageCrossover,
    RsiBands, Trigger, TriggerParams, TrendSignal, WeightedAllocator, WeightedEnsembleTrigger,
};

use super::manager::{ManagerConfig, RebalanceOutcome, RebalanceStrategyManager};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Rebalance error: {0}")]
    Rebalance(#[from] RebalanceError),
}

/// Pure-exposure baskets worth one whole base token at the seed price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PureBaskets {
    pub base: Basket,
    pub quote: Basket,
}

pub fn pure_baskets(config: &Config, market: &dyn MarketData) -> Result<PureBaskets, RebalanceError> {
    let base = Basket::single(config.base_asset(), pow10(config.assets.base_decimals)?, PRICE_SCALE)?;
    let quote = WeightedAllocator::new(config.base_asset(), config.quote_asset())?.next_basket(
        0,
        config.trigger.precision,
        &base,
        market,
    )?;
    Ok(PureBaskets { base, quote })
}

/// Market with the base asset priced off `reader` and the quote asset fixed
pub fn build_market(config: &Config, reader: &SeriesReader) -> Result<SeriesMarket, EngineError> {
    let mut market = SeriesMarket::new();
    market.register(config.base_asset(), config.assets.base_decimals, Arc::new(reader.clone()))?;
    market.register(
        config.quote_asset(),
        config.assets.quote_decimals,
        Arc::new(FixedPrice(config.quote_price()?)),
    )?;
    Ok(market)
}

pub fn build_allocator(config: &Config, baskets: &PureBaskets) -> Result<Box<dyn Allocator>, RebalanceError> {
    Ok(match config.allocator.kind {
        AllocatorKind::Binary => Box::new(BinaryAllocator::new(baskets.base.clone(), baskets.quote.clone())?),
        AllocatorKind::Weighted => Box::new(
            WeightedAllocator::new(config.base_asset(), config.quote_asset())?
                .with_min_natural_unit(u128::from(config.allocator.min_natural_unit)),
        ),
    })
}

/// Trigger for the configured kind, plus the EMA oracle when one backs it
fn build_trigger(
    config: &Config,
    reader: &SeriesReader,
) -> Result<(Box<dyn Trigger>, Option<Arc<EmaOracle>>), EngineError> {
    let owner = Principal::new(config.manager.owner.clone());
    let (average, ema): (Arc<dyn MovingAverage>, Option<Arc<EmaOracle>>) = match config.trigger.average {
        AverageKind::Sma => (Arc::new(MovingAverageOracle::new(reader.clone())), None),
        AverageKind::Ema => {
            let ema = Arc::new(EmaOracle::new(reader.clone(), owner.clone()));
            ema.add_series(&owner, config.trigger.window)?;
            (ema.clone(), Some(ema))
        }
    };
    let crossover = MovingAverageCrossover::new(Arc::new(reader.clone()), average, config.trigger.window);
    let params = TriggerParams::from(config);

    let trigger: Box<dyn Trigger> = match config.trigger.kind {
        TriggerKind::Crossover => {
            Box::new(CrossoverTrigger::new(Box::new(crossover), params, config.trigger.initial_bullish)?)
        }
        TriggerKind::Ensemble => {
            let (lower, upper) = config.rsi_bounds()?;
            let rsi = RsiBands::new(RsiOracle::new(reader.clone()), config.trigger.rsi_period, lower, upper)?;
            let (crossover_weight, rsi_weight) = match config.trigger.weights.as_slice() {
                &[a, b] => (a, b),
                other => {
                    return Err(ConfigError::ValidationError(format!("ensemble needs two weights, got {:?}", other)).into())
                }
            };
            let members: Vec<(Box<dyn TrendSignal>, u64)> =
                vec![(Box::new(crossover), crossover_weight), (Box::new(rsi), rsi_weight)];
            Box::new(
                WeightedEnsembleTrigger::new(members, params)?
                    .with_states(vec![config.trigger.initial_bullish; 2])?,
            )
        }
    };
    Ok((trigger, ema))
}

/// Basket matching the trigger's starting allocation
fn starting_basket(
    trigger: &dyn Trigger,
    config: &Config,
    baskets: &PureBaskets,
    market: &dyn MarketData,
) -> Result<Basket, RebalanceError> {
    let target = trigger.target_allocation();
    if target == trigger.precision() {
        Ok(baskets.base.clone())
    } else if target == 0 {
        Ok(baskets.quote.clone())
    } else {
        WeightedAllocator::new(config.base_asset(), config.quote_asset())?.next_basket(
            target,
            trigger.precision(),
            &baskets.base,
            market,
        )
    }
}

pub struct Engine {
    pub writer: SeriesWriter,
    pub reader: SeriesReader,
    pub market: Arc<SeriesMarket>,
    pub vehicle: Arc<InMemoryVehicle>,
    pub manager: RebalanceStrategyManager,
    /// Synced after every append so its checkpoints never fall out of the ring
    ema: Option<Arc<EmaOracle>>,
}

impl Engine {
    pub fn build(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        let (writer, reader) =
            PriceSeriesStore::new(SeriesConfig::from(config), config.seed_price()?, config.feed.seed_timestamp)?
                .into_shared();

        let market = Arc::new(build_market(config, &reader)?);
        let baskets = pure_baskets(config, market.as_ref())?;
        let (trigger, ema) = build_trigger(config, &reader)?;
        let allocator = build_allocator(config, &baskets)?;
        let initial = starting_basket(trigger.as_ref(), config, &baskets, market.as_ref())?;

        let manager_config = ManagerConfig::from(config);
        let initializer = manager_config.initializer.clone();
        let vehicle = Arc::new(InMemoryVehicle::new(
            manager_config.manager_id.clone(),
            initial,
            Arc::clone(&clock),
        ));

        let mut auction = AuctionCurveBuilder::default();
        auction.set_config(AuctionConfig::from(config))?;

        let mut manager =
            RebalanceStrategyManager::new(manager_config, trigger, allocator, auction, market.clone(), clock);
        manager.initialize(&initializer, vehicle.clone())?;

        tracing::info!(
            "Engine ready: {} / {} seeded at {} with {} slots",
            config.assets.base,
            config.assets.quote,
            config.feed.seed_price,
            config.feed.capacity
        );
        Ok(Self { writer, reader, market, vehicle, manager, ema })
    }

    /// Record a price and bring the EMA checkpoints up to date
    pub fn append(&self, price: u128, timestamp: u64) -> Result<usize, RebalanceError> {
        let written = self.writer.append(price, timestamp)?;
        if let Some(ema) = &self.ema {
            ema.sync()?;
        }
        Ok(written)
    }

    /// Feed a tape through the engine, proposing on every accepted price and
    /// confirming `confirm_after` seconds later. Pending handoffs settle at
    /// the next tape point.
    pub fn replay(
        &mut self,
        tape: &PriceTape,
        clock: &ManualClock,
        confirm_after: u64,
    ) -> Vec<SimulationEvent> {
        let mut events = Vec::new();
        for point in tape.points() {
            clock.set(clock.now().max(point.timestamp));

            if self.vehicle.is_rebalancing() {
                match self.vehicle.settle() {
                    Ok(handoff) => events.push(SimulationEvent::Settled { handoff }),
                    Err(e) => tracing::warn!("Settlement failed: {}", e),
                }
            }

            if let Err(e) = self.append(point.price, point.timestamp) {
                tracing::warn!("Tape point at {} skipped: {}", point.timestamp, e);
                events.push(SimulationEvent::Skipped {
                    timestamp: point.timestamp,
                    reason: e.to_string(),
                });
                continue;
            }

            match self.manager.initial_propose() {
                Ok(()) => {
                    events.push(SimulationEvent::Proposed { timestamp: clock.now() });
                    clock.advance(confirm_after);
                    match self.manager.confirm_propose() {
                        Ok(outcome) => events.push(SimulationEvent::Rebalanced { outcome }),
                        Err(e) => events.push(SimulationEvent::Rejected {
                            timestamp: clock.now(),
                            reason: e.to_string(),
                        }),
                    }
                }
                Err(e) => tracing::debug!("No proposal at {}: {}", point.timestamp, e),
            }
        }
        events
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimulationEvent {
    Proposed { timestamp: u64 },
    Rebalanced { outcome: RebalanceOutcome },
    Rejected { timestamp: u64, reason: String },
    Settled { handoff: SettledHandoff },
    Skipped { timestamp: u64, reason: String },
}
