// src/network/pool.rs
//! Mining pool client implementation
//!
//! Thin JSON-over-HTTP client for the pool's API: register, get work,
//! submit a found block, and submit a work proof for an exhausted range.
//! All failures map into the [`MinerError`] taxonomy; retry policy is the
//! orchestrator's concern, not this client's.

use crate::types::{BlockTemplate, NonceRange, PoolWork};
use crate::utils::error::MinerError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Characters of the wallet address used in the derived miner id
const MINER_ID_PREFIX_LEN: usize = 12;

/// Derives the pool-facing miner identifier
///
/// `first-12-chars(wallet_address) + "_" + worker_name`; wallets shorter
/// than 12 characters are used whole.
pub fn derive_miner_id(wallet_address: &str, worker_name: &str) -> String {
    let prefix: String = wallet_address.chars().take(MINER_ID_PREFIX_LEN).collect();
    format!("{}_{}", prefix, worker_name)
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    miner_id: &'a str,
    wallet_address: &'a str,
    worker_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct WorkRequest<'a> {
    miner_id: &'a str,
}

/// Raw work response; every field optional so `{}` (no work) deserializes
#[derive(Debug, Default, Deserialize)]
struct WorkResponse {
    block_height: Option<u64>,
    difficulty: Option<f64>,
    previous_hash: Option<String>,
    merkle_root: Option<String>,
    timestamp: Option<u64>,
    nonce_start: Option<u64>,
    nonce_end: Option<u64>,
    pool_address: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShareRequest<'a> {
    miner_id: &'a str,
    block_height: u64,
    nonce: u64,
    block_content_hex: &'a str,
    block_hash: &'a str,
    is_valid_block: bool,
}

#[derive(Debug, Deserialize)]
struct ShareResponse {
    #[serde(default)]
    block_found: bool,
}

#[derive(Debug, Serialize)]
struct WorkProofRequest<'a> {
    miner_id: &'a str,
    block_height: u64,
    nonce_start: u64,
    nonce_end: u64,
    best_nonce: u64,
    best_hash: &'a str,
    hashes_computed: u64,
}

#[derive(Debug, Deserialize)]
struct WorkProofResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    work_units: Option<u64>,
}

/// Converts a raw work response into a mineable unit
///
/// A missing `block_height` means the pool has no work. Any other missing
/// field is a malformed template and skips the work unit for the round.
fn work_from_response(response: WorkResponse) -> Result<PoolWork, MinerError> {
    let block_height = response.block_height.ok_or(MinerError::WorkUnavailable)?;

    let missing = |field: &str| MinerError::InvalidTemplate(format!("missing {}", field));
    let template = BlockTemplate {
        previous_hash: response.previous_hash.ok_or_else(|| missing("previous_hash"))?,
        pool_address: response.pool_address.ok_or_else(|| missing("pool_address"))?,
        merkle_root: response.merkle_root.ok_or_else(|| missing("merkle_root"))?,
        timestamp: response.timestamp.ok_or_else(|| missing("timestamp"))?,
        difficulty: response.difficulty.ok_or_else(|| missing("difficulty"))?,
        block_height,
    };

    let start = response.nonce_start.ok_or_else(|| missing("nonce_start"))?;
    let end = response.nonce_end.ok_or_else(|| missing("nonce_end"))?;
    if start > end {
        return Err(MinerError::InvalidTemplate(format!(
            "inverted nonce range {}..{}",
            start, end
        )));
    }

    Ok(PoolWork {
        template,
        range: NonceRange::new(start, end),
    })
}

/// Client for communicating with a mining pool
///
/// Handles all pool API interactions:
/// - Miner registration
/// - Work unit fetching
/// - Found-block share submission
/// - Work-proof submission for exhausted ranges
pub struct PoolClient {
    /// Pool API base URL
    base_url: String,
    /// Derived miner identifier sent with every request
    miner_id: String,
    /// Wallet address used at registration
    wallet_address: String,
    /// Worker name used at registration
    worker_name: String,
    /// HTTP client for making API requests
    client: Client,
}

impl PoolClient {
    /// Creates a new PoolClient for the given pool and credentials
    pub fn new(pool_url: &str, wallet_address: &str, worker_name: &str) -> Self {
        PoolClient {
            base_url: pool_url.trim_end_matches('/').to_string(),
            miner_id: derive_miner_id(wallet_address, worker_name),
            wallet_address: wallet_address.to_string(),
            worker_name: worker_name.to_string(),
            client: Client::new(),
        }
    }

    /// The derived miner identifier used with the pool
    pub fn miner_id(&self) -> &str {
        &self.miner_id
    }

    /// Registers this miner's credentials with the pool
    ///
    /// # Errors
    /// `MinerError::Registration` if the pool rejects the credentials;
    /// `MinerError::Network` on transport failure. Both are session-fatal.
    pub async fn register(&self) -> Result<(), MinerError> {
        let response: RegisterResponse = self
            .post(
                "/api/register",
                &RegisterRequest {
                    miner_id: &self.miner_id,
                    wallet_address: &self.wallet_address,
                    worker_name: &self.worker_name,
                },
            )
            .await?;

        if !response.success {
            return Err(MinerError::Registration(
                response.error.unwrap_or_else(|| "pool rejected credentials".into()),
            ));
        }
        Ok(())
    }

    /// Fetches one work unit from the pool
    ///
    /// # Errors
    /// `MinerError::WorkUnavailable` when the pool returns no block height
    /// (empty response); `MinerError::InvalidTemplate` for malformed work.
    pub async fn get_work(&self) -> Result<PoolWork, MinerError> {
        let response: WorkResponse = self
            .post("/api/work", &WorkRequest { miner_id: &self.miner_id })
            .await?;
        work_from_response(response)
    }

    /// Submits a found block for the given height
    ///
    /// Returns the pool's verdict on whether the block was accepted.
    pub async fn submit_share(
        &self,
        block_height: u64,
        nonce: u64,
        block_content_hex: &str,
        block_hash: &str,
    ) -> Result<bool, MinerError> {
        let response: ShareResponse = self
            .post(
                "/api/share",
                &ShareRequest {
                    miner_id: &self.miner_id,
                    block_height,
                    nonce,
                    block_content_hex,
                    block_hash,
                    is_valid_block: true,
                },
            )
            .await?;
        Ok(response.block_found)
    }

    /// Submits a work proof for an exhausted range
    ///
    /// Returns the number of work units credited by the pool.
    pub async fn submit_work_proof(
        &self,
        block_height: u64,
        range: NonceRange,
        best_nonce: u64,
        best_hash: &str,
        hashes_computed: u64,
    ) -> Result<u64, MinerError> {
        let response: WorkProofResponse = self
            .post(
                "/api/work_proof",
                &WorkProofRequest {
                    miner_id: &self.miner_id,
                    block_height,
                    nonce_start: range.start,
                    nonce_end: range.end,
                    best_nonce,
                    best_hash,
                    hashes_computed,
                },
            )
            .await?;

        if !response.success {
            return Err(MinerError::Protocol(
                "pool did not credit work proof".into(),
            ));
        }
        Ok(response.work_units.unwrap_or(0))
    }

    /// Internal helper: POST a JSON body and decode a JSON response
    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, MinerError>
    where
        Req: Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }
}
