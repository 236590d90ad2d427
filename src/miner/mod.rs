// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components of the work-distribution and
//! result-aggregation engine:
//! - The SHA-256 hashing engine behind the [`hashing::HashEngine`] seam
//! - Worker threads that mine assigned nonce sub-ranges chunk by chunk
//! - Per-share result aggregation with numeric-minimum best-hash merging
//! - The round scheduler that partitions shares across the worker pool
//! - The session orchestrator driving the fetch/mine/submit loop

/// Hashing engine trait and SHA-256 implementation
pub mod hashing;

/// Session orchestration and state machine
///
/// Owns the register → fetch → schedule → submit loop and the explicit
/// session lifecycle.
pub mod orchestrator;

/// Mining round scheduler
///
/// Partitions pool shares into per-worker nonce sub-ranges, launches the
/// workers, and races range exhaustion against block discovery.
pub mod scheduler;

/// Per-share aggregation state
pub mod share;

/// Worker thread implementation
///
/// Contains the worker loop that performs the actual hash computations
/// and streams chunk results back to the scheduler.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::hashing::{HashEngine, Sha256Engine};
pub use self::orchestrator::{MiningSession, SessionState, StopHandle};
pub use self::scheduler::Scheduler;
pub use self::share::{ShareOutcome, ShareTracker};
pub use self::worker::{Worker, WorkerEvent, WorkerState, WorkerUnit};
