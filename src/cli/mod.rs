// src/cli/mod.rs
//! Command-line interface definitions
//!
//! Clap-derived commands and options for starting a mining session,
//! benchmarking the hashing engine, and generating configuration files.

/// Command and option structures
pub mod commands;

// Re-export for easier access
pub use commands::{Action, BenchmarkOptions, Commands, ConfigOptions, StartOptions};
