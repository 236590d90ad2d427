// src/cli/commands.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stellaris Miner CLI - pool mining client in Rust
#[derive(Parser, Debug)]
#[command(name = "stellaris-miner")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining, run benchmarks, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start a mining session with the specified options
    Start(StartOptions),

    /// Run a hashing engine throughput benchmark
    Benchmark(BenchmarkOptions),

    /// Generate a configuration file template
    Config(ConfigOptions),
}

/// Options for starting a mining session
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Pool HTTP API base URL (overrides config)
    #[arg(short, long)]
    pub pool_url: Option<String>,

    /// Wallet address credited by the pool (overrides config)
    #[arg(long)]
    pub wallet: Option<String>,

    /// Worker name used in the derived miner id (overrides config)
    #[arg(long)]
    pub worker_name: Option<String>,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Work units to mine concurrently per round (overrides config)
    #[arg(short, long)]
    pub shares: Option<usize>,
}

/// Options for running hashing benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}
