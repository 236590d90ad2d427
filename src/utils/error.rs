// src/utils/error.rs
use std::io;
use thiserror::Error;

/// Main error type for the mining application
///
/// This enum represents all possible error conditions that can occur
/// during mining operations, including pool protocol, network, I/O, and
/// configuration errors.
#[derive(Error, Debug)]
pub enum MinerError {
    /// The pool rejected our credentials during registration.
    /// Session-fatal: the session aborts and does not retry.
    #[error("Registration rejected by pool: {0}")]
    Registration(String),

    /// The pool has no work available right now.
    /// Recoverable: the orchestrator backs off and fetches again.
    #[error("No work available from pool")]
    WorkUnavailable,

    /// The pool returned a template that cannot be mined
    /// (missing or malformed fields). The work unit is skipped for the round.
    #[error("Invalid block template: {0}")]
    InvalidTemplate(String),

    /// The hashing engine failed on a sub-range. Isolated to one worker;
    /// sibling workers and the share keep running.
    #[error("Worker fault: {0}")]
    WorkerFault(String),

    /// The pool answered with something the protocol does not allow
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Async task execution errors
    #[error("Task execution error: {0}")]
    Task(String),
}

/// Converts async task join errors into MinerError
///
/// Used when background tasks fail unexpectedly, including the blocking
/// scheduler round task.
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::Task(format!("Async task failed: {}", e))
    }
}
