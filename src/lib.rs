//! Rotor - Two-Asset Rotation Engine Library
//!
//! Moves a portfolio between a base and a quote asset when a moving-average
//! crossover is confirmed, building precision-safe baskets and the linear
//! auction curves that hand the portfolio over.
//!
//! # Modules
//!
//! - `domain`: Core types (Basket, AuctionParameters, fixed-point math, access control)
//! - `ports`: Trait abstractions (Clock, PortfolioVehicle, MarketData)
//! - `oracle`: Price series ring buffer with SMA, EMA and RSI readers
//! - `strategy`: Triggers, trend signals, allocators and the auction curve builder
//! - `application`: Strategy manager and engine assembly
//! - `adapters`: Clocks, market registry, in-memory vehicle, price tapes, CLI
//! - `config`: Configuration loading and validation

pub mod domain;
pub mod ports;
pub mod oracle;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
