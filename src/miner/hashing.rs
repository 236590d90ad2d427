// src/miner/hashing.rs
//! SHA-256 hashing engine
//!
//! Implements the proof-of-work primitive consumed by the worker threads:
//! hashing a nonce sub-range against a block template and checking the
//! Stellaris difficulty rule. The block serialization format is fixed by
//! the pool protocol and must be preserved byte-exact.

use crate::types::{BlockTemplate, ChunkResult, max_hash};
use crate::utils::error::MinerError;
use sha2::{Digest, Sha256};

/// Common interface for hashing engines
///
/// The scheduler and workers are generic over this trait so tests can
/// substitute scripted engines for the real SHA-256 implementation.
pub trait HashEngine: Send + Sync {
    /// Hash every nonce in `[nonce_start, nonce_end)` against the template
    ///
    /// Returns early with `found = true` as soon as a hash satisfies the
    /// difficulty rule; otherwise scans the whole range and reports the
    /// numerically smallest hash seen.
    ///
    /// # Errors
    /// Returns `MinerError::InvalidTemplate` if template fields cannot be
    /// decoded.
    fn mine_range(
        &self,
        template: &BlockTemplate,
        nonce_start: u64,
        nonce_end: u64,
    ) -> Result<ChunkResult, MinerError>;

    /// Deterministically serialize the full block content for a nonce
    ///
    /// Used to reconstruct the winning block for pool submission.
    fn build_block_content(
        &self,
        template: &BlockTemplate,
        nonce: u64,
    ) -> Result<String, MinerError>;
}

/// The production SHA-256 engine
///
/// Stateless; a single instance is shared across all worker threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Engine;

impl Sha256Engine {
    /// Creates a new engine instance
    pub fn new() -> Self {
        Sha256Engine
    }
}

impl HashEngine for Sha256Engine {
    fn mine_range(
        &self,
        template: &BlockTemplate,
        nonce_start: u64,
        nonce_end: u64,
    ) -> Result<ChunkResult, MinerError> {
        let prefix = block_prefix(template)?;
        let chunk = difficulty_chunk(&template.previous_hash, template.difficulty);

        let mut best_hash = max_hash();
        let mut best_nonce = nonce_start;
        let mut hashes_computed = 0u64;

        for nonce in nonce_start..nonce_end {
            let mut content = prefix.clone();
            content.extend_from_slice(&(nonce as u32).to_le_bytes());

            let hash_hex = hex::encode(Sha256::digest(&content));
            hashes_computed += 1;

            // Fixed-width lowercase hex, so string order is numeric order
            if hash_hex < best_hash {
                best_hash = hash_hex.clone();
                best_nonce = nonce;
            }

            if check_difficulty(&hash_hex, chunk, template.difficulty) {
                return Ok(ChunkResult {
                    found: true,
                    nonce,
                    hash: hash_hex,
                    hashes_computed,
                    best_nonce,
                    best_hash,
                });
            }
        }

        Ok(ChunkResult {
            found: false,
            nonce: best_nonce,
            hash: best_hash.clone(),
            hashes_computed,
            best_nonce,
            best_hash,
        })
    }

    fn build_block_content(
        &self,
        template: &BlockTemplate,
        nonce: u64,
    ) -> Result<String, MinerError> {
        let mut content = block_prefix(template)?;
        content.extend_from_slice(&(nonce as u32).to_le_bytes());
        Ok(hex::encode(content))
    }
}

/// Serializes the nonce-independent portion of the block content
///
/// Layout: optional version byte (0x02 for 33-byte compressed addresses),
/// previous hash bytes, address bytes, merkle root bytes, timestamp as
/// u32 little-endian, difficulty scaled by 10 as u16 little-endian. The
/// nonce (u32 little-endian) is appended per hash attempt.
fn block_prefix(template: &BlockTemplate) -> Result<Vec<u8>, MinerError> {
    let address_bytes = decode_address(&template.pool_address)?;
    let previous = hex::decode(&template.previous_hash)
        .map_err(|_| MinerError::InvalidTemplate("invalid previous_hash".into()))?;
    let merkle = hex::decode(&template.merkle_root)
        .map_err(|_| MinerError::InvalidTemplate("invalid merkle_root".into()))?;

    let mut prefix = Vec::with_capacity(1 + previous.len() + address_bytes.len() + merkle.len() + 6);

    if address_bytes.len() == 33 {
        prefix.push(2u8);
    }

    prefix.extend_from_slice(&previous);
    prefix.extend_from_slice(&address_bytes);
    prefix.extend_from_slice(&merkle);
    prefix.extend_from_slice(&(template.timestamp as u32).to_le_bytes());

    let difficulty_scaled = (template.difficulty * 10.0) as u16;
    prefix.extend_from_slice(&difficulty_scaled.to_le_bytes());

    Ok(prefix)
}

/// Decodes a pool address from hex or base58
fn decode_address(address: &str) -> Result<Vec<u8>, MinerError> {
    if let Ok(bytes) = hex::decode(address) {
        return Ok(bytes);
    }

    bs58::decode(address)
        .into_vec()
        .map_err(|_| MinerError::InvalidTemplate(format!("invalid pool address: {}", address)))
}

/// The difficulty prefix a candidate hash must start with
///
/// The last `difficulty as usize` characters of the previous block's hash.
fn difficulty_chunk(previous_hash: &str, difficulty: f64) -> &str {
    let chunk_len = difficulty as usize;
    &previous_hash[previous_hash.len().saturating_sub(chunk_len)..]
}

/// Checks whether a hash satisfies the difficulty rule
///
/// The hash must start with `chunk`. A fractional difficulty additionally
/// constrains the next hex digit: with fractional part `d`, the digit at
/// position `floor(difficulty)` must fall in the first `ceil(16 * (1 - d))`
/// characters of `0123456789abcdef`.
fn check_difficulty(hash_hex: &str, chunk: &str, difficulty: f64) -> bool {
    if !hash_hex.starts_with(chunk) {
        return false;
    }

    let decimal = difficulty % 1.0;
    if decimal > 0.0 {
        let charset = "0123456789abcdef";
        let count = (16.0 * (1.0 - decimal)).ceil() as usize;
        let valid_chars = &charset[..count];
        let idifficulty = difficulty as usize;

        if let Some(char_at_pos) = hash_hex.chars().nth(idifficulty) {
            return valid_chars.contains(char_at_pos);
        }
        return false;
    }

    true
}
