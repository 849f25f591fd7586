//! CLI command implementations for eureka-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `config`: Configuration file generation
//! - `test`: One-shot fetch of every configured registry

pub mod config;
pub mod test;

// Re-export command functions
pub use config::command_config;
pub use test::command_test;
