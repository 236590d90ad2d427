// src/miner/share.rs
//! Per-share result aggregation
//!
//! Each pool-assigned work unit ("share") gets one tracker that merges
//! chunk results arriving concurrently from every worker assigned to it.
//! The merge is a 256-bit numeric minimum over best hashes, which is
//! commutative and associative: the final best pair is the range-wide
//! minimum regardless of arrival order.

use crate::types::{BlockTemplate, ChunkResult, NonceRange, max_hash};
use std::sync::{Arc, Mutex};

/// Mutable aggregation state, guarded by the tracker's mutex
#[derive(Debug)]
struct ShareState {
    best_hash: String,
    best_nonce: u64,
    total_hashes: u64,
    complete: bool,
    /// Winning nonce/hash pair, set at most once
    found: Option<(u64, String)>,
}

/// Aggregation state for one share, safe for concurrent worker access
#[derive(Debug)]
pub struct ShareTracker {
    /// Share identifier, unique within a round
    pub id: u64,
    /// The block template this share mines against
    pub template: Arc<BlockTemplate>,
    /// Full nonce range assigned to this share by the pool
    pub range: NonceRange,
    state: Mutex<ShareState>,
}

/// Immutable snapshot of a share's final state after a round
#[derive(Debug, Clone)]
pub struct ShareOutcome {
    /// Share identifier
    pub id: u64,
    /// The block template the share mined against
    pub template: Arc<BlockTemplate>,
    /// Full nonce range assigned to the share
    pub range: NonceRange,
    /// Numerically smallest hash seen across all workers
    pub best_hash: String,
    /// Nonce paired with `best_hash`
    pub best_nonce: u64,
    /// Total hashes computed across all workers
    pub total_hashes: u64,
    /// Whether the share resolved (exhausted or found)
    pub complete: bool,
    /// Winning nonce/hash pair when a block was found
    pub found: Option<(u64, String)>,
}

impl ShareOutcome {
    /// True if a block was found for this share
    pub fn block_found(&self) -> bool {
        self.found.is_some()
    }
}

impl ShareTracker {
    /// Creates a tracker with best-hash initialized to the maximal value
    pub fn new(id: u64, template: Arc<BlockTemplate>, range: NonceRange) -> Self {
        ShareTracker {
            id,
            template,
            range,
            state: Mutex::new(ShareState {
                best_hash: max_hash(),
                best_nonce: range.start,
                total_hashes: 0,
                complete: false,
                found: None,
            }),
        }
    }

    /// Merges one chunk result into the share
    ///
    /// Adds the chunk's hash count and replaces the best pair when the
    /// chunk's best hash is strictly smaller. Hashes are fixed-width
    /// lowercase hex, so string comparison is numeric comparison.
    pub fn record(&self, chunk: &ChunkResult) {
        let mut state = self.state.lock().expect("share tracker lock poisoned");
        state.total_hashes += chunk.hashes_computed;
        if chunk.best_hash < state.best_hash {
            state.best_hash = chunk.best_hash.clone();
            state.best_nonce = chunk.best_nonce;
        }
    }

    /// Records a found block, keeping only the first caller's pair
    ///
    /// Idempotent under duplicate found signals: at most one winning nonce
    /// is ever reported to the pool per share. Returns `true` for the first
    /// caller, `false` for any later one.
    pub fn mark_found(&self, nonce: u64, hash: &str) -> bool {
        let mut state = self.state.lock().expect("share tracker lock poisoned");
        if state.found.is_some() {
            return false;
        }
        state.found = Some((nonce, hash.to_string()));
        state.complete = true;
        true
    }

    /// Marks the share complete without a found block (range exhausted)
    pub fn mark_complete(&self) {
        let mut state = self.state.lock().expect("share tracker lock poisoned");
        state.complete = true;
    }

    /// Whether the share has resolved, by exhaustion or by a found block
    pub fn is_complete(&self) -> bool {
        self.state.lock().expect("share tracker lock poisoned").complete
    }

    /// Whether a block has been found for this share
    pub fn block_found(&self) -> bool {
        self.state
            .lock()
            .expect("share tracker lock poisoned")
            .found
            .is_some()
    }

    /// Takes a snapshot of the share's current state
    pub fn snapshot(&self) -> ShareOutcome {
        let state = self.state.lock().expect("share tracker lock poisoned");
        ShareOutcome {
            id: self.id,
            template: self.template.clone(),
            range: self.range,
            best_hash: state.best_hash.clone(),
            best_nonce: state.best_nonce,
            total_hashes: state.total_hashes,
            complete: state.complete,
            found: state.found.clone(),
        }
    }
}
