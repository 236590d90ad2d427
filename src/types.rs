// src/types.rs
use serde::{Deserialize, Serialize};

/// Hash values are fixed-width lowercase hex strings of this many characters.
pub const HASH_HEX_LEN: usize = 64;

/// The "worst possible" hash: every hex digit at its maximum.
///
/// Used to initialize best-hash tracking so that any real hash replaces it.
/// Because hashes are fixed-width lowercase hex, plain string comparison is
/// exactly 256-bit big-endian numeric comparison.
pub fn max_hash() -> String {
    "f".repeat(HASH_HEX_LEN)
}

/// Block template assigned by the pool for one share
///
/// Immutable once assigned; identifies the block being mined. Hash fields
/// are 64-character lowercase hex strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTemplate {
    /// Hash of the previous block (64 hex chars)
    pub previous_hash: String,
    /// Pool payout address (hex or base58 encoded)
    pub pool_address: String,
    /// Merkle root of the block's transactions (64 hex chars)
    pub merkle_root: String,
    /// Block timestamp (seconds since epoch)
    pub timestamp: u64,
    /// Difficulty parameter; the integer part is the required hash prefix
    /// length, the fractional part narrows the next hex digit
    pub difficulty: f64,
    /// Height of the block being mined
    pub block_height: u64,
}

/// Half-open nonce interval `[start, end)`
///
/// Ranges assigned to sibling workers within one share are contiguous,
/// non-overlapping, and together cover the share's full range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceRange {
    /// First nonce in the range (inclusive)
    pub start: u64,
    /// One past the last nonce in the range (exclusive)
    pub end: u64,
}

impl NonceRange {
    /// Creates a new range. Callers must uphold `start <= end`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "invalid nonce range {start}..{end}");
        NonceRange { start, end }
    }

    /// Number of nonces in the range
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// True if the range contains no nonces
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// One pool-assigned unit of work: a template plus the nonce range to scan
#[derive(Debug, Clone, PartialEq)]
pub struct PoolWork {
    /// Template of the block to mine
    pub template: BlockTemplate,
    /// Full nonce range assigned by the pool
    pub range: NonceRange,
}

/// Output of one chunk of hashing work
///
/// Produced by a single hashing engine invocation over a nonce sub-range.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkResult {
    /// True iff `hash` satisfies the difficulty rule for the template
    pub found: bool,
    /// The winning nonce when `found`, otherwise the best nonce seen
    pub nonce: u64,
    /// The winning hash when `found`, otherwise the best hash seen
    pub hash: String,
    /// Number of nonces actually hashed in this chunk
    pub hashes_computed: u64,
    /// Nonce that produced the numerically smallest hash in this chunk
    pub best_nonce: u64,
    /// Numerically smallest hash seen in this chunk (64 hex chars)
    pub best_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_len_and_empty() {
        assert_eq!(NonceRange::new(0, 100).len(), 100);
        assert_eq!(NonceRange::new(5, 5).len(), 0);
        assert!(NonceRange::new(5, 5).is_empty());
        assert!(!NonceRange::new(5, 6).is_empty());
    }

    #[test]
    fn max_hash_is_fixed_width() {
        assert_eq!(max_hash().len(), HASH_HEX_LEN);
        assert!(max_hash().chars().all(|c| c == 'f'));
    }
}
