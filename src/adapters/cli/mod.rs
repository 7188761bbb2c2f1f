//! CLI Adapter
//!
//! Command-line interface for the rotor engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{execute, CliApp, Command, Holding, PlanCmd, SimulateCmd, ValidateCmd};

