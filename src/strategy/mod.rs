//! Strategy Layer - Confirmed Trend Rotation
//!
//! Decides when to rotate between a base and a quote asset and what to rotate into:
//! - Trend signals read moving averages and RSI off the price series
//! - Two-phase triggers arm on a signal and confirm it inside a time window
//! - Allocators turn a confirmed target allocation into the next basket
//! - The auction curve prices the handoff between baskets
//!
//! Trigger Options:
//! - `CrossoverTrigger`: all-in/all-out on a single crossover signal
//! - `WeightedEnsembleTrigger`: fractional allocation from weighted signals

pub mod allocation;
pub mod auction_curve;
pub mod crossover;
pub mod ensemble;
pub mod params;
pub mod signal;
pub mod trigger;

pub use allocation::{compute_value, Allocator, BinaryAllocator, WeightedAllocator};
pub use auction_curve::{build_linear, fair_value, AuctionConfig, AuctionCurveBuilder, Incoming};
pub use crossover::{CrossoverState, CrossoverTrigger};
pub use ensemble::{EnsembleProposal, WeightedEnsembleTrigger};
pub use params::{ConfirmationWindow, TriggerParams, DAY, HOUR};
pub use signal::{Bias, MovingAverageCrossover, RsiBands, TrendSignal};
pub use trigger::Trigger;
