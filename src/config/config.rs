// src/config/config.rs
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the mining application
///
/// Contains all settings needed to run a mining session: pool connection
/// and credentials, worker pool sizing, and chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Base URL of the pool's HTTP API (e.g., "http://pool.example.com:8080")
    pub pool_url: String,

    /// Wallet address credited by the pool
    pub wallet_address: String,

    /// Worker name, combined with the wallet address into the miner id
    #[serde(default = "default_worker_name")]
    pub worker_name: String,

    /// Number of worker threads to use for mining
    /// (0 = one per CPU core)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Number of work units to fetch and mine concurrently per round
    /// (default: 1)
    #[serde(default = "default_pool_shares")]
    pub pool_shares: usize,

    /// Workers assigned to each share
    /// (0 = divide the worker threads evenly across shares)
    #[serde(default)]
    pub workers_per_share: usize,

    /// Nonces per hashing engine call; bounds the latency of cancellation
    /// checks between chunks (default: 50000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

fn default_worker_name() -> String {
    "worker1".into()
}

fn default_worker_threads() -> usize {
    num_cpus::get()
}

fn default_pool_shares() -> usize {
    1
}

fn default_chunk_size() -> u64 {
    50_000
}

impl MinerConfig {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(MinerConfig)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::Config(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&config_str)
            .map_err(|e| MinerError::Config(format!("Invalid config format: {}", e)))
    }

    /// Checks the configuration for unrecoverable problems
    ///
    /// # Errors
    /// `MinerError::Config` for an empty wallet address, a pool URL that
    /// does not parse, or a setup that leaves zero workers.
    pub fn validate(&self) -> Result<(), MinerError> {
        if self.wallet_address.is_empty() {
            return Err(MinerError::Config("wallet_address is required".into()));
        }
        if self.worker_name.is_empty() {
            return Err(MinerError::Config("worker_name is required".into()));
        }
        url::Url::parse(&self.pool_url)
            .map_err(|e| MinerError::Config(format!("invalid pool_url '{}': {}", self.pool_url, e)))?;
        if self.pool_shares == 0 {
            return Err(MinerError::Config("pool_shares must be positive".into()));
        }
        if self.chunk_size == 0 {
            return Err(MinerError::Config("chunk_size must be positive".into()));
        }
        if self.total_workers() == 0 {
            return Err(MinerError::Config("at least one worker is required".into()));
        }
        Ok(())
    }

    /// Worker threads after resolving the 0 = auto default
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }

    /// Workers per share after resolving the 0 = auto default
    ///
    /// Auto divides the worker threads evenly across the configured
    /// shares, with a floor of one worker per share.
    pub fn effective_workers_per_share(&self) -> usize {
        if self.workers_per_share == 0 {
            (self.effective_worker_threads() / self.pool_shares.max(1)).max(1)
        } else {
            self.workers_per_share
        }
    }

    /// Total size of the worker pool for a session
    pub fn total_workers(&self) -> usize {
        self.pool_shares * self.effective_workers_per_share()
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# Stellaris Miner Configuration\n\n");
        template.push_str("# Pool HTTP API base URL\n");
        template.push_str("pool_url = \"http://pool.example.com:8080\"\n");
        template.push_str("# Wallet address credited by the pool\n");
        template.push_str("wallet_address = \"your_wallet_address\"\n");
        template.push_str("# Worker name; miner id = first 12 wallet chars + \"_\" + worker name\n");
        template.push_str("worker_name = \"worker1\"\n");
        template.push_str("# Number of worker threads (0 = one per CPU core)\n");
        template.push_str("worker_threads = 0\n");
        template.push_str("# Work units mined concurrently per round\n");
        template.push_str("pool_shares = 1\n");
        template.push_str("# Workers per share (0 = split threads evenly across shares)\n");
        template.push_str("workers_per_share = 0\n");
        template.push_str("# Nonces per hashing call; bounds cancellation latency\n");
        template.push_str("chunk_size = 50000\n");
        template
    }

    /// A small, valid configuration for unit tests
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        MinerConfig {
            pool_url: "http://127.0.0.1:9090".into(),
            wallet_address: "abcdefghijklmnop".into(),
            worker_name: "test".into(),
            worker_threads: 2,
            pool_shares: 1,
            workers_per_share: 2,
            chunk_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: MinerConfig = toml::from_str(
            r#"
            pool_url = "http://localhost:8080"
            wallet_address = "abcdef"
            "#,
        )
        .unwrap();

        assert_eq!(config.worker_name, "worker1");
        assert_eq!(config.pool_shares, 1);
        assert_eq!(config.chunk_size, 50_000);
        assert!(config.effective_worker_threads() >= 1);
        config.validate().unwrap();
    }

    #[test]
    fn auto_workers_per_share_divides_threads() {
        let mut config = MinerConfig::for_tests();
        config.worker_threads = 8;
        config.pool_shares = 2;
        config.workers_per_share = 0;
        assert_eq!(config.effective_workers_per_share(), 4);
        assert_eq!(config.total_workers(), 8);
    }

    #[test]
    fn template_round_trips_through_toml() {
        let template = MinerConfig::generate_template();
        let config: MinerConfig = toml::from_str(&template).unwrap();
        assert_eq!(config.pool_url, "http://pool.example.com:8080");
        config.validate().unwrap();
    }

    #[test]
    fn bad_url_fails_validation() {
        let mut config = MinerConfig::for_tests();
        config.pool_url = "not a url".into();
        assert!(config.validate().is_err());
    }
}
