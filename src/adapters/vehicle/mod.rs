//! Portfolio vehicle adapters

mod in_memory;

pub use in_memory::{InMemoryVehicle, SettledHandoff};
