//! End-to-end rebalance flow through the public API
//!
//! Seeded series -> SMA crossover -> two-phase confirmation -> weighted
//! basket -> vehicle handoff.

use std::sync::Arc;

use rotor::adapters::{InMemoryVehicle, ManualClock, SeriesMarket};
use rotor::application::{ManagerConfig, ManagerPhase, RebalanceStrategyManager};
use rotor::domain::{AssetId, Basket, Principal, RebalanceError, PRICE_SCALE};
use rotor::oracle::{FixedPrice, MovingAverage, MovingAverageOracle, PriceSeriesStore, SeriesConfig, SeriesWriter};
use rotor::ports::{Clock, PortfolioVehicle};
use rotor::strategy::{
    Allocator, AuctionCurveBuilder, CrossoverTrigger, MovingAverageCrossover, Trigger, TriggerParams,
    WeightedAllocator, DAY, HOUR,
};

const SEED_TS: u64 = 1_700_000_000;

struct Harness {
    clock: Arc<ManualClock>,
    writer: SeriesWriter,
    average: Arc<MovingAverageOracle>,
    market: Arc<SeriesMarket>,
    vehicle: Arc<InMemoryVehicle>,
    manager: RebalanceStrategyManager,
}

fn weth() -> AssetId {
    AssetId::from("WETH")
}

fn usdc() -> AssetId {
    AssetId::from("USDC")
}

fn create_test_harness() -> Harness {
    let clock = Arc::new(ManualClock::new(SEED_TS));
    let (writer, reader) = PriceSeriesStore::new(SeriesConfig::default(), 150 * PRICE_SCALE, SEED_TS)
        .unwrap()
        .into_shared();

    let mut market = SeriesMarket::new();
    market.register(weth(), 18, Arc::new(reader.clone())).unwrap();
    market.register(usdc(), 6, Arc::new(FixedPrice(PRICE_SCALE))).unwrap();
    let market = Arc::new(market);

    let average = Arc::new(MovingAverageOracle::new(reader.clone()));
    let signal = MovingAverageCrossover::new(Arc::new(reader), average.clone(), 20);
    let trigger = CrossoverTrigger::new(Box::new(signal), TriggerParams::default(), true).unwrap();

    let manager_id = Principal::from("manager");
    let vehicle = Arc::new(InMemoryVehicle::new(
        manager_id.clone(),
        Basket::single(weth(), PRICE_SCALE, PRICE_SCALE).unwrap(),
        clock.clone(),
    ));

    let mut manager = RebalanceStrategyManager::new(
        ManagerConfig {
            manager_id,
            owner: Principal::from("ops"),
            initializer: Principal::from("deployer"),
            rebalance_interval: DAY,
        },
        Box::new(trigger),
        Box::new(WeightedAllocator::new(weth(), usdc()).unwrap()),
        AuctionCurveBuilder::default(),
        market.clone(),
        clock.clone(),
    );
    manager.initialize(&Principal::from("deployer"), vehicle.clone()).unwrap();

    Harness { clock, writer, average, market, vehicle, manager }
}

/// Eighteen flat days at 150, then a drop to 140
fn feed_drop(harness: &Harness) {
    for day in 1..=18 {
        harness.writer.append(150 * PRICE_SCALE, SEED_TS + day * DAY).unwrap();
    }
    harness.writer.append(140 * PRICE_SCALE, SEED_TS + 19 * DAY).unwrap();
    harness.clock.set(SEED_TS + 19 * DAY);
}

#[test]
fn test_crossover_rotates_into_quote() {
    let mut harness = create_test_harness();
    feed_drop(&harness);

    // (19 * 150 + 140) / 20
    assert_eq!(harness.average.read(20).unwrap(), 1495 * PRICE_SCALE / 10);

    harness.manager.initial_propose().unwrap();
    assert!(harness.manager.trigger().is_armed());
    assert_eq!(harness.manager.status().phase, ManagerPhase::Proposed);

    // Too early: window opens after six hours
    harness.clock.advance(5 * HOUR);
    assert!(matches!(
        harness.manager.confirm_propose(),
        Err(RebalanceError::OutOfWindow { .. })
    ));

    harness.clock.advance(2 * HOUR);
    let expected = WeightedAllocator::new(weth(), usdc())
        .unwrap()
        .next_basket(0, 100, &harness.vehicle.current_basket(), harness.market.as_ref())
        .unwrap();
    let outcome = harness.manager.confirm_propose().unwrap();

    assert_eq!(outcome.target_allocation, 0);
    assert_eq!(outcome.basket, expected);
    assert_eq!(outcome.basket.unit_of(&weth()), None);
    assert_eq!(outcome.current_value, 140 * PRICE_SCALE);
    assert!(outcome.next_value <= outcome.current_value);
    assert!(outcome.auction.is_monotonic());

    assert!(harness.vehicle.is_rebalancing());
    assert!(!harness.manager.trigger().is_armed());
    assert_eq!(harness.manager.trigger().target_allocation(), 0);

    let handoff = harness.vehicle.settle().unwrap();
    assert_eq!(handoff.to, expected);
    assert_eq!(harness.vehicle.current_basket(), expected);
    assert_eq!(harness.vehicle.last_rebalance_timestamp(), harness.clock.now());
}

#[test]
fn test_late_confirmation_is_rejected() {
    let mut harness = create_test_harness();
    feed_drop(&harness);

    harness.manager.initial_propose().unwrap();
    harness.clock.advance(13 * HOUR);

    assert!(matches!(
        harness.manager.confirm_propose(),
        Err(RebalanceError::OutOfWindow { .. })
    ));
    assert!(!harness.vehicle.is_rebalancing());
    // The lapsed proposal no longer blocks a fresh one
    assert_eq!(harness.manager.status().phase, ManagerPhase::Default);
    harness.manager.initial_propose().unwrap();
}

#[test]
fn test_flat_market_never_proposes() {
    let mut harness = create_test_harness();
    for day in 1..=5 {
        harness.writer.append(150 * PRICE_SCALE, SEED_TS + day * DAY).unwrap();
    }
    harness.clock.set(SEED_TS + 5 * DAY);

    assert!(matches!(
        harness.manager.initial_propose(),
        Err(RebalanceError::ConditionNotMet(_))
    ));
    assert!(!harness.manager.trigger().is_armed());
}
