//! CLI command implementations for hostmon.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Metric source validation
//! - `config`: Configuration file generation
//! - `test`: Sampling loop testing

pub mod check;
pub mod config;
pub mod test;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use test::command_test;
