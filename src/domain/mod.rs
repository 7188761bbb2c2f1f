//! Domain Layer - Core value types for the rotation engine
//!
//! Pure types and arithmetic with no I/O. External interactions happen
//! through the ports layer.
//!
//! - `basket`: Basket composition and asset identifiers
//! - `auction`: Linear handoff auction parameters
//! - `access`: Owner gating and the one-shot initializer capability
//! - `fixed_point`: 10^18-scaled integer arithmetic, always rounding down
//! - `error`: The shared error taxonomy

pub mod access;
pub mod auction;
pub mod basket;
pub mod error;
pub mod fixed_point;

pub use access::{AccessGuard, OneShot, Principal};
pub use auction::{AuctionParameters, CurveDirection, PRICE_DIVISOR};
pub use basket::{AssetId, Basket, BasketComponent};
pub use error::RebalanceError;
pub use fixed_point::{mul_div, pow10, BASKET_DECIMALS, PRICE_DECIMALS, PRICE_SCALE};
