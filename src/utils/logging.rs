// src/utils/logging.rs
//! Logging setup for the miner
//!
//! Two `env_logger` configurations share one custom format: the mining
//! session logs with module and line context so scheduler and worker
//! events can be traced, while the benchmark subcommand logs bare
//! messages so its throughput readout stays clean. Both honor `RUST_LOG`
//! when set.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes logging for a mining session
///
/// Defaults to `Info`; raise to `Debug` via `RUST_LOG` to trace session
/// state transitions, per-worker cancellation, and discarded shares.
/// Every line carries the emitting module and line number.
pub fn init_logging() {
    let mut builder = session_log_config();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter_level(LevelFilter::Info);
    }

    builder.init();
}

/// Initializes logging for the benchmark subcommand
///
/// The benchmark only reports thread count and throughput totals, so the
/// format drops the module/line prefix and keeps the timestamp.
pub fn init_bench_logging() {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", buf.timestamp_seconds(), record.args())
        })
        .target(Target::Stdout);

    if env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter_level(LevelFilter::Info);
    }

    builder.init();
}

/// Base builder for session logging
///
/// Format: `[<epoch secs> <LEVEL> <module>:<line>] <message>`, written to
/// stdout.
fn session_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
