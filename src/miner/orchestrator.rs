// src/miner/orchestrator.rs
//! Top-level mining session orchestration
//!
//! Owns the session lifecycle: register with the pool, fetch work, hand it
//! to the scheduler, submit the results, repeat. All session state lives in
//! [`MiningSession`]; there are no globals. The orchestrator never hashes —
//! it only awaits pool responses, the scheduler's round, and pacing delays,
//! so cancellation propagation is never delayed.

use crate::config::MinerConfig;
use crate::miner::hashing::{HashEngine, Sha256Engine};
use crate::miner::scheduler::Scheduler;
use crate::miner::share::ShareOutcome;
use crate::network::pool::PoolClient;
use crate::stats::{StatsHandle, StatsReporter, StatusUpdate};
use crate::types::PoolWork;
use crate::utils::error::MinerError;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task;

/// Delay before refetching when the pool has no work
const WORK_BACKOFF: Duration = Duration::from_secs(5);
/// Pacing delay between rounds to avoid hammering the pool
const ROUND_PACING: Duration = Duration::from_millis(100);

/// Session state machine positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not running
    Idle,
    /// Registering credentials with the pool
    Registering,
    /// Fetching work units from the pool
    Fetching,
    /// A mining round is in flight
    Scheduling,
    /// Reporting round results to the pool
    Submitting,
}

/// What to report to the pool for one resolved share
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// A block was found: submit the full block, never a work proof
    Block {
        /// Winning nonce
        nonce: u64,
        /// Winning hash
        hash: String,
    },
    /// Range exhausted without a block: submit best-effort work proof
    WorkProof {
        /// Nonce of the numerically smallest hash seen
        best_nonce: u64,
        /// Numerically smallest hash seen
        best_hash: String,
        /// Total hashes computed for the share
        total_hashes: u64,
    },
}

/// Decides the submission for a share outcome
///
/// A found block supersedes the work-proof path for its share. Shares that
/// never resolved (forced stop) are not submitted at all.
pub fn plan_submission(outcome: &ShareOutcome) -> Option<Submission> {
    if let Some((nonce, hash)) = &outcome.found {
        return Some(Submission::Block {
            nonce: *nonce,
            hash: hash.clone(),
        });
    }
    if outcome.complete {
        return Some(Submission::WorkProof {
            best_nonce: outcome.best_nonce,
            best_hash: outcome.best_hash.clone(),
            total_hashes: outcome.total_hashes,
        });
    }
    None
}

/// Handle for requesting session shutdown from another task or thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests a cooperative stop: in-flight chunks finish first, and
    /// not-yet-submitted share state is discarded.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// One mining session against a pool
///
/// Explicit init/teardown lifecycle: create with [`MiningSession::new`],
/// drive with [`MiningSession::run`], stop via the [`StopHandle`].
pub struct MiningSession {
    config: MinerConfig,
    pool: PoolClient,
    engine: Arc<Sha256Engine>,
    stats: StatsHandle,
    status_tx: Sender<StatusUpdate>,
    stop: Arc<AtomicBool>,
    state: SessionState,
}

impl MiningSession {
    /// Creates a session from validated configuration
    ///
    /// Returns the session plus the status-update receiver for the display
    /// collaborator.
    ///
    /// # Errors
    /// Returns `MinerError::Config` for unusable configuration (no workers,
    /// missing wallet, malformed pool URL).
    pub fn new(config: MinerConfig) -> Result<(Self, Receiver<StatusUpdate>), MinerError> {
        config.validate()?;
        let pool = PoolClient::new(
            &config.pool_url,
            &config.wallet_address,
            &config.worker_name,
        );
        let (status_tx, status_rx) = unbounded();

        Ok((
            MiningSession {
                config,
                pool,
                engine: Arc::new(Sha256Engine::new()),
                stats: StatsHandle::new(),
                status_tx,
                stop: Arc::new(AtomicBool::new(false)),
                state: SessionState::Idle,
            },
            status_rx,
        ))
    }

    /// Returns a handle that can stop this session
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
        }
    }

    /// Read-only access to the session statistics
    pub fn stats(&self) -> &StatsHandle {
        &self.stats
    }

    /// Current position in the session state machine
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session until stopped or a fatal error
    ///
    /// State machine: Idle → Registering → Fetching → Scheduling →
    /// Submitting → Fetching… and back to Idle on stop. Registration
    /// failure aborts the session without retrying; everything else
    /// degrades to skip-and-retry-next-round.
    pub async fn run(mut self) -> Result<(), MinerError> {
        self.transition(SessionState::Registering, "registering with pool");
        self.pool.register().await?;
        log::info!("registered with pool as {}", self.pool.miner_id());

        let reporter = StatsReporter::new(self.stats.clone(), self.status_tx.clone());
        reporter.start();

        // The reporter thread must not outlive the session loop, whether
        // it ends by stop request or by error.
        let result = self.mine_until_stopped().await;

        reporter.stop();
        self.transition(SessionState::Idle, "session stopped");
        result
    }

    /// The fetch → schedule → submit loop, run until stopped or failed
    async fn mine_until_stopped(&mut self) -> Result<(), MinerError> {
        let worker_count = self.config.total_workers();
        let mut scheduler = Some(Scheduler::new(
            self.engine.clone(),
            worker_count,
            self.config.effective_workers_per_share(),
            self.config.chunk_size,
            self.stop.clone(),
            self.stats.clone(),
        )?);
        log::info!(
            "mining with {} workers across {} share(s)",
            worker_count,
            self.config.pool_shares
        );

        while !self.stop.load(Ordering::Relaxed) {
            self.transition(SessionState::Fetching, "fetching work");
            let work = self.fetch_work().await;

            if work.is_empty() {
                self.transition(SessionState::Fetching, "no work available, backing off");
                self.sleep_unless_stopped(WORK_BACKOFF).await;
                continue;
            }

            self.transition(SessionState::Scheduling, "mining round started");
            let mut sched = scheduler.take().ok_or_else(|| {
                MinerError::Task("scheduler missing between rounds".into())
            })?;
            let (sched, round) = task::spawn_blocking(move || {
                let round = sched.run_round(work);
                (sched, round)
            })
            .await?;
            scheduler = Some(sched);
            let outcomes = round?;

            if self.stop.load(Ordering::Relaxed) {
                // Forced stop discards not-yet-submitted share state
                break;
            }

            self.transition(SessionState::Submitting, "submitting round results");
            for outcome in &outcomes {
                self.submit_outcome(outcome).await;
            }

            self.sleep_unless_stopped(ROUND_PACING).await;
        }

        Ok(())
    }

    /// Fetches up to `pool_shares` work units sequentially
    ///
    /// Unusable responses (no work, invalid template, network failure) are
    /// skipped for the round, not retried.
    async fn fetch_work(&self) -> Vec<PoolWork> {
        let mut work = Vec::with_capacity(self.config.pool_shares);
        for _ in 0..self.config.pool_shares {
            match self.pool.get_work().await {
                Ok(unit) => work.push(unit),
                Err(MinerError::WorkUnavailable) => {
                    log::debug!("pool has no work for this slot");
                }
                Err(MinerError::InvalidTemplate(msg)) => {
                    log::warn!("skipping unusable work unit: {}", msg);
                }
                Err(e) => {
                    log::warn!("work fetch failed: {}", e);
                }
            }
        }
        work
    }

    /// Reports one resolved share to the pool
    ///
    /// Submission failures are logged and counted, never retried for the
    /// share; the round moves on.
    async fn submit_outcome(&self, outcome: &ShareOutcome) {
        let template = &outcome.template;
        match plan_submission(outcome) {
            Some(Submission::Block { nonce, hash }) => {
                self.stats.add_block_found();
                let content = match self.engine.build_block_content(template, nonce) {
                    Ok(content) => content,
                    Err(e) => {
                        self.stats.add_failed_submission();
                        log::error!(
                            "cannot rebuild block {} for submission: {}",
                            template.block_height,
                            e
                        );
                        return;
                    }
                };
                match self
                    .pool
                    .submit_share(template.block_height, nonce, &content, &hash)
                    .await
                {
                    Ok(pool_confirmed) => {
                        self.stats.add_share_submitted();
                        log::info!(
                            "submitted block {} (nonce {}), pool confirmed: {}",
                            template.block_height,
                            nonce,
                            pool_confirmed
                        );
                    }
                    Err(e) => {
                        self.stats.add_failed_submission();
                        log::warn!(
                            "share submission for block {} dropped: {}",
                            template.block_height,
                            e
                        );
                    }
                }
            }
            Some(Submission::WorkProof { best_nonce, best_hash, total_hashes }) => {
                match self
                    .pool
                    .submit_work_proof(
                        template.block_height,
                        outcome.range,
                        best_nonce,
                        &best_hash,
                        total_hashes,
                    )
                    .await
                {
                    Ok(units) => {
                        self.stats.add_share_submitted();
                        self.stats.add_work_units(units);
                        log::debug!(
                            "work proof for block {} accepted ({} units)",
                            template.block_height,
                            units
                        );
                    }
                    Err(e) => {
                        self.stats.add_failed_submission();
                        log::warn!(
                            "work proof for block {} dropped: {}",
                            template.block_height,
                            e
                        );
                    }
                }
            }
            None => {
                log::debug!(
                    "share {} discarded without submission (incomplete)",
                    outcome.id
                );
            }
        }
    }

    /// Records a state transition and notifies the display collaborator
    fn transition(&mut self, state: SessionState, message: &str) {
        self.state = state;
        log::debug!("session state: {:?} ({})", state, message);
        let _ = self.status_tx.send(StatusUpdate {
            message: message.to_string(),
            stats: self.stats.snapshot(),
        });
    }

    /// Sleeps in one-second slices so a stop request is honored promptly
    async fn sleep_unless_stopped(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() && !self.stop.load(Ordering::Relaxed) {
            let slice = remaining.min(Duration::from_secs(1));
            tokio::time::sleep(slice).await;
            remaining -= slice;
        }
    }
}
