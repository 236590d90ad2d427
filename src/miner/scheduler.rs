// src/miner/scheduler.rs
//! Mining round scheduler implementation
//!
//! Partitions pool-assigned shares across the worker pool, launches the
//! worker threads, and drives the round's event loop: chunk results are
//! merged into the share trackers, a found block cancels that share's
//! siblings, and the round resolves once every share has either exhausted
//! its range or found a block. Completion is signaled over the worker
//! event channel; there is no polling.

use crate::miner::hashing::HashEngine;
use crate::miner::share::{ShareOutcome, ShareTracker};
use crate::miner::worker::{Assignment, Worker, WorkerEvent, WorkerState, WorkerUnit};
use crate::stats::StatsHandle;
use crate::types::{NonceRange, PoolWork};
use crate::utils::error::MinerError;
use crossbeam_channel::unbounded;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Splits a range into up to `parts` contiguous sub-ranges
///
/// Each sub-range spans `ceil(len / parts)` nonces except the last, whose
/// end is clamped to the range's end. Empty sub-ranges are skipped, so
/// ranges too small to subdivide yield fewer pieces than requested.
pub fn partition_range(range: NonceRange, parts: usize) -> Vec<NonceRange> {
    if range.is_empty() || parts == 0 {
        return Vec::new();
    }

    let size = range.len().div_ceil(parts as u64);
    let mut pieces = Vec::with_capacity(parts);
    let mut start = range.start;
    while start < range.end {
        let end = start.saturating_add(size).min(range.end);
        pieces.push(NonceRange::new(start, end));
        start = end;
    }
    pieces
}

/// Coordinates one round of mining across the worker pool
///
/// Owns the worker bookkeeping records, which are created once and reused
/// across rounds. The scheduler itself never hashes; its event loop only
/// dispatches assignments and aggregates results, so cancellation is
/// propagated without delay.
pub struct Scheduler<E: HashEngine + 'static> {
    /// Shared hashing engine handle
    engine: Arc<E>,
    /// Workers assigned to each share when multiple shares run concurrently
    workers_per_share: usize,
    /// Nonces per engine invocation; bounds cancellation latency
    chunk_size: u64,
    /// Global stop flag, raised on explicit session stop
    stop: Arc<AtomicBool>,
    /// Session statistics fed from every chunk result
    stats: StatsHandle,
    /// Worker records, indexed by worker id
    units: Vec<WorkerUnit>,
}

impl<E: HashEngine + 'static> Scheduler<E> {
    /// Creates a scheduler with a fixed pool of `worker_count` workers
    ///
    /// # Errors
    /// Returns `MinerError::Config` if the pool would be empty or chunks
    /// would be zero-sized.
    pub fn new(
        engine: Arc<E>,
        worker_count: usize,
        workers_per_share: usize,
        chunk_size: u64,
        stop: Arc<AtomicBool>,
        stats: StatsHandle,
    ) -> Result<Self, MinerError> {
        if worker_count == 0 || workers_per_share == 0 {
            return Err(MinerError::Config("at least one worker is required".into()));
        }
        if chunk_size == 0 {
            return Err(MinerError::Config("chunk_size must be positive".into()));
        }

        Ok(Scheduler {
            engine,
            workers_per_share,
            chunk_size,
            stop,
            stats,
            units: (0..worker_count).map(WorkerUnit::new).collect(),
        })
    }

    /// Number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.units.len()
    }

    /// Runs one mining round over the given shares to resolution
    ///
    /// Blocks until every share is complete: either its workers exhausted
    /// their ranges or one of its own workers found a block (which cancels
    /// only that share's siblings). Returns a final snapshot per share, in
    /// input order. On global stop, cancels everything, joins the workers,
    /// and returns the partial snapshots.
    pub fn run_round(&mut self, work: Vec<PoolWork>) -> Result<Vec<ShareOutcome>, MinerError> {
        if work.is_empty() {
            return Ok(Vec::new());
        }
        if work.len() > self.units.len() {
            return Err(MinerError::Config(format!(
                "{} shares exceed the {}-worker pool",
                work.len(),
                self.units.len()
            )));
        }

        let trackers: Vec<Arc<ShareTracker>> = work
            .into_iter()
            .enumerate()
            .map(|(i, w)| {
                Arc::new(ShareTracker::new(i as u64, Arc::new(w.template), w.range))
            })
            .collect();
        let cancels: Vec<Arc<AtomicBool>> = trackers
            .iter()
            .map(|_| Arc::new(AtomicBool::new(false)))
            .collect();

        let (tx, rx) = unbounded::<WorkerEvent>();
        let mut handles = Vec::new();
        let mut pending: HashMap<u64, usize> = HashMap::new();
        let mut unresolved = 0usize;
        let mut next_unit = 0usize;

        for (idx, tracker) in trackers.iter().enumerate() {
            // Reserve one worker for each share still waiting its turn
            let shares_after = trackers.len() - idx - 1;
            let available = self.units.len() - next_unit - shares_after;
            let per_share = self.workers_per_share.min(available).max(1);

            let pieces = partition_range(tracker.range, per_share);
            if pieces.is_empty() {
                // Nothing to scan; the share resolves immediately
                tracker.mark_complete();
                continue;
            }

            unresolved += 1;
            pending.insert(tracker.id, pieces.len());

            for piece in pieces {
                let unit = &mut self.units[next_unit];
                unit.assign(tracker.id, piece);

                let worker = Worker::new(unit.id, self.engine.clone(), tx.clone());
                let assignment = Assignment {
                    share_id: tracker.id,
                    template: tracker.template.clone(),
                    range: piece,
                    chunk_size: self.chunk_size,
                    cancel: cancels[idx].clone(),
                    stop: self.stop.clone(),
                };
                handles.push(std::thread::spawn(move || worker.run(assignment)));
                next_unit += 1;
            }
        }

        // Workers hold the only senders now; recv fails once they all exit.
        drop(tx);
        self.stats.set_mining(true);

        while unresolved > 0 {
            let event = match rx.recv() {
                Ok(event) => event,
                Err(_) => break,
            };

            match event {
                WorkerEvent::Initialized { worker_id } => {
                    let unit = &mut self.units[worker_id];
                    unit.state = WorkerState::Mining;
                    unit.last_update = Instant::now();
                }
                WorkerEvent::Result { worker_id, share_id, chunk } => {
                    self.stats.add_hashes(chunk.hashes_computed);
                    let unit = &mut self.units[worker_id];
                    unit.hashes_this_share += chunk.hashes_computed;
                    unit.last_update = Instant::now();

                    let tracker = &trackers[share_id as usize];
                    tracker.record(&chunk);

                    if chunk.found {
                        unit.state = WorkerState::Complete;
                        // Only the first found report wins; duplicates are
                        // a benign race and change nothing.
                        if tracker.mark_found(chunk.nonce, &chunk.hash) {
                            cancels[share_id as usize].store(true, Ordering::Relaxed);
                            unresolved -= 1;
                            log::info!(
                                "block found for share {} at nonce {} by worker {}",
                                share_id,
                                chunk.nonce,
                                worker_id
                            );
                        }
                    }
                }
                WorkerEvent::RangeComplete { worker_id, share_id } => {
                    let unit = &mut self.units[worker_id];
                    unit.state = WorkerState::Complete;
                    unit.last_update = Instant::now();
                    if Self::settle_worker(&mut pending, &trackers, share_id) {
                        unresolved -= 1;
                    }
                }
                WorkerEvent::Error { worker_id, share_id, message } => {
                    log::warn!(
                        "worker {} failed on share {}: {}",
                        worker_id,
                        share_id,
                        message
                    );
                    let unit = &mut self.units[worker_id];
                    unit.state = WorkerState::Errored;
                    unit.last_update = Instant::now();
                    if Self::settle_worker(&mut pending, &trackers, share_id) {
                        unresolved -= 1;
                    }
                }
            }

            if self.stop.load(Ordering::Relaxed) {
                break;
            }
        }

        // Release any workers still scanning, then wait them out. In-flight
        // chunks finish first; cancellation is cooperative.
        for cancel in &cancels {
            cancel.store(true, Ordering::Relaxed);
        }
        for handle in handles {
            let _ = handle.join();
        }
        self.stats.set_mining(false);

        Ok(trackers.iter().map(|t| t.snapshot()).collect())
    }

    /// Accounts for one worker leaving its share
    ///
    /// Returns true when this resolves the share: its last worker is done
    /// and no block was found for it.
    fn settle_worker(
        pending: &mut HashMap<u64, usize>,
        trackers: &[Arc<ShareTracker>],
        share_id: u64,
    ) -> bool {
        let left = match pending.get_mut(&share_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return false,
        };

        let tracker = &trackers[share_id as usize];
        if left == 0 && !tracker.is_complete() {
            tracker.mark_complete();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockTemplate, ChunkResult, max_hash};
    use std::sync::Mutex;
    use std::time::Duration;

    fn template(height: u64) -> BlockTemplate {
        BlockTemplate {
            previous_hash: "00".repeat(32),
            pool_address: "ab".repeat(33),
            merkle_root: "11".repeat(32),
            timestamp: 1_700_000_000,
            difficulty: 6.0,
            block_height: height,
        }
    }

    /// Engine that records scanned sub-ranges, optionally finds a block at
    /// one nonce, fails on another, and can slow chunks down to exercise
    /// cancellation.
    struct ScriptedEngine {
        calls: Mutex<Vec<(u64, u64)>>,
        found_at: Option<u64>,
        fail_at: Option<u64>,
        chunk_delay: Duration,
    }

    impl ScriptedEngine {
        fn new() -> Self {
            ScriptedEngine {
                calls: Mutex::new(Vec::new()),
                found_at: None,
                fail_at: None,
                chunk_delay: Duration::ZERO,
            }
        }

        fn scanned(&self) -> Vec<(u64, u64)> {
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
            if !self.chunk_delay.is_zero() {
                std::thread::sleep(self.chunk_delay);
            }
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
                // encode the chunk start so the tracker minimum is knowable
                best_nonce: nonce_start,
                best_hash: format!("{:060x}{:04x}", 1, nonce_start % 0x10000),
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

    fn scheduler(
        engine: Arc<ScriptedEngine>,
        workers: usize,
        per_share: usize,
        chunk: u64,
    ) -> Scheduler<ScriptedEngine> {
        Scheduler::new(
            engine,
            workers,
            per_share,
            chunk,
            Arc::new(AtomicBool::new(false)),
            StatsHandle::new(),
        )
        .unwrap()
    }

    #[test]
    fn partition_divides_with_clamped_tail() {
        let pieces = partition_range(NonceRange::new(1000, 1100), 3);
        assert_eq!(
            pieces,
            vec![
                NonceRange::new(1000, 1034),
                NonceRange::new(1034, 1068),
                NonceRange::new(1068, 1100),
            ]
        );
    }

    #[test]
    fn partition_has_no_gaps_or_overlap() {
        for parts in 1..=7 {
            let range = NonceRange::new(13, 13 + 97);
            let pieces = partition_range(range, parts);
            assert!(pieces.iter().all(|p| !p.is_empty()));
            assert_eq!(pieces.first().unwrap().start, range.start);
            assert_eq!(pieces.last().unwrap().end, range.end);
            for pair in pieces.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            assert_eq!(pieces.iter().map(|p| p.len()).sum::<u64>(), range.len());
        }
    }

    #[test]
    fn partition_skips_empty_pieces_for_tiny_ranges() {
        // 2 nonces across 5 workers: only 2 single-nonce pieces
        let pieces = partition_range(NonceRange::new(10, 12), 5);
        assert_eq!(
            pieces,
            vec![NonceRange::new(10, 11), NonceRange::new(11, 12)]
        );
        assert!(partition_range(NonceRange::new(4, 4), 3).is_empty());
    }

    #[test]
    fn round_scans_full_ranges_exactly_once() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut sched = scheduler(engine.clone(), 6, 3, 10);

        let outcomes = sched
            .run_round(vec![
                PoolWork { template: template(1), range: NonceRange::new(0, 100) },
                PoolWork { template: template(2), range: NonceRange::new(1000, 1100) },
            ])
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert!(outcome.complete);
            assert!(!outcome.block_found());
            assert_eq!(outcome.total_hashes, 100);
        }

        // union of scanned chunks covers each share exactly once
        let mut scanned = engine.scanned();
        scanned.sort_unstable();
        let covered: u64 = scanned.iter().map(|(s, e)| e - s).sum();
        assert_eq!(covered, 200);
        for pair in scanned.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "overlap between {:?} and {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn tracker_minimum_spans_all_workers() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut sched = scheduler(engine, 4, 4, 7);

        let outcomes = sched
            .run_round(vec![PoolWork {
                template: template(1),
                range: NonceRange::new(100, 200),
            }])
            .unwrap();

        // smallest scripted best-hash comes from the lowest chunk start
        assert_eq!(outcomes[0].best_nonce, 100);
        assert_eq!(outcomes[0].best_hash, format!("{:060x}{:04x}", 1, 100));
    }

    #[test]
    fn found_block_cancels_only_that_shares_siblings() {
        let engine = Arc::new(ScriptedEngine {
            found_at: Some(3),
            chunk_delay: Duration::from_millis(2),
            ..ScriptedEngine::new()
        });
        let mut sched = scheduler(engine.clone(), 6, 3, 5);

        // share 0 finds almost immediately; share 1 must still be scanned
        // to completion despite the cancellation on share 0
        let outcomes = sched
            .run_round(vec![
                PoolWork { template: template(1), range: NonceRange::new(0, 600) },
                PoolWork { template: template(2), range: NonceRange::new(10_000, 10_100) },
            ])
            .unwrap();

        let found = &outcomes[0];
        assert!(found.complete);
        assert_eq!(found.found, Some((3, format!("{:064x}", 3))));

        let other = &outcomes[1];
        assert!(other.complete);
        assert!(!other.block_found());
        assert_eq!(other.total_hashes, 100);

        // share 0's siblings were canceled well before exhausting 600 nonces
        let share0_hashes: u64 = engine
            .scanned()
            .iter()
            .filter(|(s, _)| *s < 600)
            .map(|(s, e)| e - s)
            .sum();
        assert!(share0_hashes < 600, "siblings kept mining a solved share");
    }

    #[test]
    fn worker_fault_is_isolated_to_one_range() {
        let engine = Arc::new(ScriptedEngine {
            fail_at: Some(25),
            ..ScriptedEngine::new()
        });
        let mut sched = scheduler(engine, 2, 2, 10);

        let outcomes = sched
            .run_round(vec![PoolWork {
                template: template(1),
                range: NonceRange::new(0, 100),
            }])
            .unwrap();

        // worker over [0,50) dies at its chunk containing 25; the share
        // still resolves from the surviving worker's [50,100)
        let outcome = &outcomes[0];
        assert!(outcome.complete);
        assert!(!outcome.block_found());
        assert!(outcome.total_hashes >= 50);
        assert!(outcome.total_hashes < 100);
    }

    #[test]
    fn more_shares_than_workers_is_a_config_error() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut sched = scheduler(engine, 1, 1, 10);
        let work = vec![
            PoolWork { template: template(1), range: NonceRange::new(0, 10) },
            PoolWork { template: template(2), range: NonceRange::new(10, 20) },
        ];
        assert!(matches!(
            sched.run_round(work),
            Err(MinerError::Config(_))
        ));
    }

    #[test]
    fn empty_share_resolves_without_workers() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut sched = scheduler(engine, 2, 2, 10);

        let outcomes = sched
            .run_round(vec![PoolWork {
                template: template(1),
                range: NonceRange::new(42, 42),
            }])
            .unwrap();

        assert!(outcomes[0].complete);
        assert_eq!(outcomes[0].total_hashes, 0);
    }

    #[test]
    fn zero_workers_rejected_at_construction() {
        let engine = Arc::new(ScriptedEngine::new());
        assert!(matches!(
            Scheduler::new(
                engine,
                0,
                1,
                10,
                Arc::new(AtomicBool::new(false)),
                StatsHandle::new(),
            ),
            Err(MinerError::Config(_))
        ));
    }
}
