//! Application Layer - Rebalance coordination
//!
//! - `manager`: two-phase propose/confirm flow against a portfolio vehicle
//! - `engine`: config-driven assembly and price tape replay

pub mod engine;
pub mod manager;

pub use engine::{Engine, EngineError, PureBaskets, SimulationEvent};
pub use manager::{
    plan_rebalance, ManagerConfig, ManagerPhase, ManagerStatus, RebalanceOutcome, RebalanceStrategyManager,
};
