// src/network/mod.rs
//! Network communication components
//!
//! This module handles all network interaction with the mining pool over
//! its JSON/HTTP API. The client is deliberately thin: it maps requests
//! and responses onto the crate's types and error taxonomy, while retry
//! and backoff policy stay with the orchestrator.

/// Mining pool client implementation
///
/// Registration, work fetching, and result submission against the pool's
/// `/api/*` endpoints.
pub mod pool;

// Re-export main components for cleaner imports
pub use pool::PoolClient;
