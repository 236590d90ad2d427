//! Stellaris Miner - pool mining client in Rust
//!
//! This crate implements a pool-mining client for the Stellaris chain:
//! - Work distribution across concurrent worker threads
//! - Per-share best-candidate tracking and result aggregation
//! - A race between range exhaustion and block discovery, with
//!   cooperative per-share cancellation
//! - Result reporting (found blocks and work proofs) to the pool's
//!   JSON/HTTP API

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core implementation: hashing, workers, shares, scheduling, and
/// session orchestration
pub mod miner;

/// Network communication with the mining pool
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::MinerConfig;
pub use miner::{HashEngine, MiningSession, Scheduler, Sha256Engine, ShareTracker, StopHandle, Worker};
pub use network::PoolClient;
pub use stats::{SessionStats, StatsHandle, StatsReporter, StatusUpdate};
pub use types::{BlockTemplate, ChunkResult, NonceRange, PoolWork};
pub use utils::{MinerError, init_logging};
