// src/main.rs
use clap::Parser;
use std::time::{Duration, Instant};
use stellaris_miner::miner::MiningSession;
use stellaris_miner::miner::hashing::{HashEngine, Sha256Engine};
use stellaris_miner::stats::StatsHandle;
use stellaris_miner::types::BlockTemplate;
use stellaris_miner::utils::logging::init_bench_logging;
use stellaris_miner::{MinerError, cli, config, utils};
use tokio::runtime::Runtime;

/// Main entry point for the Stellaris miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts a mining session with the given configuration options
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads configuration and applies CLI overrides
/// 3. Creates the session and wires ctrl-c to its stop handle
/// 4. Drives the session on a tokio runtime until it stops
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = config::load(&opts.config)?;
    // Apply CLI overrides
    if let Some(pool_url) = opts.pool_url {
        config.pool_url = pool_url;
    }
    if let Some(wallet) = opts.wallet {
        config.wallet_address = wallet;
    }
    if let Some(worker_name) = opts.worker_name {
        config.worker_name = worker_name;
    }
    if let Some(workers) = opts.workers {
        config.worker_threads = workers;
    }
    if let Some(shares) = opts.shares {
        config.pool_shares = shares;
    }

    let (session, status_rx) = MiningSession::new(config)?;
    let stop = session.stop_handle();

    // Display collaborator: consume status updates on a background thread
    std::thread::spawn(move || {
        for update in status_rx {
            log::debug!(
                "status: {} ({:.2} H/s, {} shares, {} blocks)",
                update.message,
                update.stats.hashrate,
                update.stats.shares_submitted,
                update.stats.blocks_found
            );
        }
    });

    let rt = Runtime::new()?;
    rt.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("stop requested, finishing in-flight chunks");
                stop.stop();
            }
        });
        session.run().await
    })
}

/// Runs a hashing engine throughput benchmark
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Spawns hashing threads over a synthetic template
/// 3. Reports total hashes and average throughput
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    // Difficulty requires the full previous hash as prefix, so the
    // benchmark never terminates early on a found block.
    let template = BlockTemplate {
        previous_hash: "ab".repeat(32),
        pool_address: "cd".repeat(33),
        merkle_root: "11".repeat(32),
        timestamp: 1_700_000_000,
        difficulty: 64.0,
        block_height: 0,
    };

    let stats = StatsHandle::new();
    log::info!(
        "Starting benchmark: {} threads for {} seconds",
        opts.threads,
        opts.duration
    );

    let start_time = Instant::now();
    let handles: Vec<_> = (0..opts.threads)
        .map(|thread_id| {
            let stats = stats.clone();
            let template = template.clone();
            let offset = bench_nonce_offset(thread_id, opts.threads);
            std::thread::spawn(move || -> Result<(), MinerError> {
                let engine = Sha256Engine::new();
                let mut nonce = offset;
                const BENCH_CHUNK: u64 = 10_000;

                while start_time.elapsed().as_secs() < opts.duration {
                    let chunk = engine.mine_range(&template, nonce, nonce + BENCH_CHUNK)?;
                    stats.add_hashes(chunk.hashes_computed);
                    nonce += BENCH_CHUNK;
                }
                Ok(())
            })
        })
        .collect();

    // Wait for all threads to complete
    for handle in handles {
        handle
            .join()
            .map_err(|_| MinerError::Task("benchmark thread panicked".into()))??;
    }

    let elapsed = start_time.elapsed().max(Duration::from_secs(1));
    let snapshot = stats.snapshot();
    log::info!("Benchmark results:");
    log::info!("Total hashes: {}", snapshot.total_hashes);
    log::info!(
        "Average hashrate: {:.2} H/s",
        snapshot.total_hashes as f64 / elapsed.as_secs_f64()
    );
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Starting nonce for one benchmark thread
///
/// The hashing engine serializes nonces as u32, so threads are spread
/// evenly within u32 space; offsetting by whole u32 multiples would make
/// every thread hash the same sequence.
fn bench_nonce_offset(thread_id: usize, threads: usize) -> u64 {
    let stride = u64::from(u32::MAX) / threads.max(1) as u64;
    thread_id as u64 * stride
}

/// Generates a configuration template file
///
/// # Operations
/// 1. Generates template content
/// 2. Writes template to specified output file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template();
    std::fs::write(opts.output, config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bench_offsets_stay_distinct_after_u32_truncation() {
        for threads in [1, 2, 4, 16] {
            let truncated: HashSet<u32> = (0..threads)
                .map(|id| bench_nonce_offset(id, threads) as u32)
                .collect();
            assert_eq!(truncated.len(), threads, "{} threads collide", threads);
        }
    }

    #[test]
    fn bench_offsets_leave_room_for_chunks() {
        let threads = 8;
        let stride = bench_nonce_offset(1, threads);
        // each thread can hash many chunks before reaching its neighbor
        assert!(stride > 10_000 * 1000);
        let last = bench_nonce_offset(threads - 1, threads);
        assert!(last < u64::from(u32::MAX));
    }
}
