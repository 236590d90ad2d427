// src/stats/mod.rs
//! Statistics collection and reporting module
//!
//! This module provides functionality for tracking and reporting mining
//! statistics, including:
//! - Session-wide counters (hashes, shares, blocks, work units)
//! - Rolling hash-rate calculation over a shared sampling window
//! - Status updates for a display/UI collaborator
//!
//! The main components are [`StatsHandle`], the cloneable counter handle
//! threaded through the scheduler and orchestrator, and [`StatsReporter`],
//! which periodically samples throughput and publishes status updates.

/// Submodule containing the statistics handle and reporter implementation
pub mod reporter;

// Re-export main components
pub use reporter::{SessionStats, StatsHandle, StatsReporter, StatusUpdate};
