// src/miner/worker.rs
//! Worker thread implementation
//!
//! Handles the actual mining work by processing an assigned nonce range in
//! chunks and reporting every chunk result back to the scheduler. The
//! cancellation flags are checked between chunks only; a hashing engine
//! call is atomic and never interrupted mid-chunk.

use crate::miner::hashing::HashEngine;
use crate::types::{BlockTemplate, ChunkResult, NonceRange};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Lifecycle state of a worker unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No assignment for the current round
    Idle,
    /// Actively hashing its assigned sub-range
    Mining,
    /// Finished its range, or stopped after a found block
    Complete,
    /// The hashing engine failed on its sub-range
    Errored,
}

/// Events streamed from worker threads to the scheduler
///
/// Consumed via exhaustive matching in the scheduler's event loop.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The worker thread started on its assignment
    Initialized {
        /// Reporting worker
        worker_id: usize,
    },
    /// One chunk of hashing finished
    Result {
        /// Reporting worker
        worker_id: usize,
        /// Share the chunk belongs to
        share_id: u64,
        /// The chunk's output
        chunk: ChunkResult,
    },
    /// The worker exhausted its assigned range without finding a block
    RangeComplete {
        /// Reporting worker
        worker_id: usize,
        /// Share the range belonged to
        share_id: u64,
    },
    /// The hashing engine failed; fatal to this worker only
    Error {
        /// Reporting worker
        worker_id: usize,
        /// Share the worker was assigned to
        share_id: u64,
        /// Engine error description
        message: String,
    },
}

/// Bookkeeping record for one worker, owned by the scheduler
///
/// Created once when the pool size is determined and reused across share
/// rounds; the assignment fields are overwritten each round.
#[derive(Debug)]
pub struct WorkerUnit {
    /// Stable worker index
    pub id: usize,
    /// Share assigned for the current round, if any
    pub assigned_share: Option<u64>,
    /// Sub-range assigned for the current round
    pub range: NonceRange,
    /// Current lifecycle state
    pub state: WorkerState,
    /// Hashes credited to this worker for the current share
    pub hashes_this_share: u64,
    /// When this worker last reported an event
    pub last_update: Instant,
}

impl WorkerUnit {
    /// Creates an idle worker record
    pub fn new(id: usize) -> Self {
        WorkerUnit {
            id,
            assigned_share: None,
            range: NonceRange::new(0, 0),
            state: WorkerState::Idle,
            hashes_this_share: 0,
            last_update: Instant::now(),
        }
    }

    /// Resets the record for a new round's assignment
    pub fn assign(&mut self, share_id: u64, range: NonceRange) {
        self.assigned_share = Some(share_id);
        self.range = range;
        self.state = WorkerState::Idle;
        self.hashes_this_share = 0;
        self.last_update = Instant::now();
    }
}

/// One round's assignment handed to a worker thread
#[derive(Clone)]
pub struct Assignment {
    /// Share this assignment mines for
    pub share_id: u64,
    /// Template of the share's block
    pub template: Arc<BlockTemplate>,
    /// Contiguous sub-range of the share's nonce range
    pub range: NonceRange,
    /// Nonces per hashing engine invocation; bounds cancellation latency
    pub chunk_size: u64,
    /// Raised when this share's block has been found elsewhere
    pub cancel: Arc<AtomicBool>,
    /// Raised on explicit session stop
    pub stop: Arc<AtomicBool>,
}

/// Worker thread body that performs mining computations
///
/// Each worker processes its assigned nonce range chunk by chunk using the
/// shared hashing engine, streaming a result per chunk to the scheduler.
pub struct Worker<E: HashEngine> {
    id: usize,
    engine: Arc<E>,
    events: Sender<WorkerEvent>,
}

impl<E: HashEngine> Worker<E> {
    /// Creates a new worker bound to the scheduler's event channel
    pub fn new(id: usize, engine: Arc<E>, events: Sender<WorkerEvent>) -> Self {
        Worker { id, engine, events }
    }

    /// Mines the assignment to completion, cancellation, or engine error
    ///
    /// Emits `Initialized` once, then one `Result` per chunk. Stops without
    /// further events once a cancellation flag is observed. On `found` in
    /// any chunk, stops immediately after reporting that chunk. On range
    /// exhaustion emits `RangeComplete`. Engine errors emit `Error` and end
    /// the worker without affecting siblings.
    pub fn run(&self, assignment: Assignment) {
        let _ = self.events.send(WorkerEvent::Initialized { worker_id: self.id });

        let mut cursor = assignment.range.start;
        while cursor < assignment.range.end {
            // Cooperative cancellation point, between chunks only
            if assignment.cancel.load(Ordering::Relaxed)
                || assignment.stop.load(Ordering::Relaxed)
            {
                log::debug!(
                    "worker {} canceled at nonce {} (share {})",
                    self.id,
                    cursor,
                    assignment.share_id
                );
                return;
            }

            let chunk_end = cursor
                .saturating_add(assignment.chunk_size)
                .min(assignment.range.end);

            match self.engine.mine_range(&assignment.template, cursor, chunk_end) {
                Ok(chunk) => {
                    let found = chunk.found;
                    let _ = self.events.send(WorkerEvent::Result {
                        worker_id: self.id,
                        share_id: assignment.share_id,
                        chunk,
                    });
                    if found {
                        // Highest-priority event in the system: stop at once
                        // so siblings can be canceled without wasted work.
                        return;
                    }
                }
                Err(e) => {
                    let _ = self.events.send(WorkerEvent::Error {
                        worker_id: self.id,
                        share_id: assignment.share_id,
                        message: e.to_string(),
                    });
                    return;
                }
            }

            cursor = chunk_end;
        }

        let _ = self.events.send(WorkerEvent::RangeComplete {
            worker_id: self.id,
            share_id: assignment.share_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::max_hash;
    use crate::utils::error::MinerError;
    use crossbeam_channel::unbounded;
    use std::sync::Mutex;

    /// Engine that records every requested sub-range and optionally finds
    /// a block at a fixed nonce or fails on a fixed nonce.
    struct ScriptedEngine {
        calls: Mutex<Vec<(u64, u64)>>,
        found_at: Option<u64>,
        fail_at: Option<u64>,
    }

    impl ScriptedEngine {
        fn scanning() -> Self {
            ScriptedEngine {
                calls: Mutex::new(Vec::new()),
                found_at: None,
                fail_at: None,
            }
        }

        fn finding(nonce: u64) -> Self {
            ScriptedEngine {
                found_at: Some(nonce),
                ..Self::scanning()
            }
        }

        fn failing(nonce: u64) -> Self {
            ScriptedEngine {
                fail_at: Some(nonce),
                ..Self::scanning()
            }
        }

        fn calls(&self) -> Vec<(u64, u64)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl HashEngine for ScriptedEngine {
        fn mine_range(
            &self,
            _template: &BlockTemplate,
            nonce_start: u64,
            nonce_end: u64,
        ) -> Result<ChunkResult, MinerError> {
            if let Some(fail) = self.fail_at {
                if (nonce_start..nonce_end).contains(&fail) {
                    return Err(MinerError::WorkerFault("scripted failure".into()));
                }
            }
            self.calls.lock().unwrap().push((nonce_start, nonce_end));

            if let Some(found) = self.found_at {
                if (nonce_start..nonce_end).contains(&found) {
                    return Ok(ChunkResult {
                        found: true,
                        nonce: found,
                        hash: format!("{:064x}", found),
                        hashes_computed: found - nonce_start + 1,
                        best_nonce: found,
                        best_hash: format!("{:064x}", found),
                    });
                }
            }

            Ok(ChunkResult {
                found: false,
                nonce: nonce_start,
                hash: max_hash(),
                hashes_computed: nonce_end - nonce_start,
                best_nonce: nonce_start,
                best_hash: format!("{:064x}", nonce_start + 1),
            })
        }

        fn build_block_content(
            &self,
            _template: &BlockTemplate,
            nonce: u64,
        ) -> Result<String, MinerError> {
            Ok(format!("{:08x}", nonce))
        }
    }

    fn template() -> Arc<BlockTemplate> {
        Arc::new(BlockTemplate {
            previous_hash: "00".repeat(32),
            pool_address: "ab".repeat(33),
            merkle_root: "11".repeat(32),
            timestamp: 1_700_000_000,
            difficulty: 6.0,
            block_height: 1,
        })
    }

    fn assignment(range: NonceRange, chunk_size: u64) -> Assignment {
        Assignment {
            share_id: 1,
            template: template(),
            range,
            chunk_size,
            cancel: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn chunks_cover_range_with_short_tail() {
        let engine = Arc::new(ScriptedEngine::scanning());
        let (tx, rx) = unbounded();
        let worker = Worker::new(0, engine.clone(), tx);

        worker.run(assignment(NonceRange::new(0, 100), 30));

        assert_eq!(engine.calls(), vec![(0, 30), (30, 60), (60, 90), (90, 100)]);

        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(events[0], WorkerEvent::Initialized { worker_id: 0 }));

        let total: u64 = events
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::Result { chunk, .. } => Some(chunk.hashes_computed),
                _ => None,
            })
            .sum();
        assert_eq!(total, 100);

        assert!(matches!(
            events.last(),
            Some(WorkerEvent::RangeComplete { share_id: 1, .. })
        ));
    }

    #[test]
    fn stops_after_found_with_no_further_chunks() {
        let engine = Arc::new(ScriptedEngine::finding(35));
        let (tx, rx) = unbounded();
        let worker = Worker::new(2, engine.clone(), tx);

        worker.run(assignment(NonceRange::new(0, 100), 30));

        // chunks [0,30) and [30,60) only; no scan past the found chunk
        assert_eq!(engine.calls(), vec![(0, 30), (30, 60)]);

        let events: Vec<_> = rx.try_iter().collect();
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, WorkerEvent::RangeComplete { .. }))
        );
        match events.last() {
            Some(WorkerEvent::Result { chunk, .. }) => {
                assert!(chunk.found);
                assert_eq!(chunk.nonce, 35);
            }
            other => panic!("expected final Result event, got {:?}", other),
        }
    }

    #[test]
    fn cancellation_is_honored_between_chunks() {
        let engine = Arc::new(ScriptedEngine::scanning());
        let (tx, rx) = unbounded();
        let worker = Worker::new(1, engine.clone(), tx);

        let a = assignment(NonceRange::new(0, 100), 30);
        a.cancel.store(true, Ordering::Relaxed);
        worker.run(a);

        // canceled before the first chunk: no engine calls, no results
        assert!(engine.calls().is_empty());
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], WorkerEvent::Initialized { .. }));
    }

    #[test]
    fn engine_error_ends_worker_with_error_event() {
        let engine = Arc::new(ScriptedEngine::failing(40));
        let (tx, rx) = unbounded();
        let worker = Worker::new(3, engine.clone(), tx);

        worker.run(assignment(NonceRange::new(0, 100), 30));

        let events: Vec<_> = rx.try_iter().collect();
        match events.last() {
            Some(WorkerEvent::Error { worker_id: 3, share_id: 1, message }) => {
                assert!(message.contains("scripted failure"));
            }
            other => panic!("expected Error event, got {:?}", other),
        }
    }

    #[test]
    fn empty_range_completes_immediately() {
        let engine = Arc::new(ScriptedEngine::scanning());
        let (tx, rx) = unbounded();
        let worker = Worker::new(0, engine.clone(), tx);

        worker.run(assignment(NonceRange::new(50, 50), 30));

        assert!(engine.calls().is_empty());
        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(
            events.last(),
            Some(WorkerEvent::RangeComplete { .. })
        ));
    }
}
