// src/stats/reporter.rs
use crossbeam_channel::Sender;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Number of one-second throughput samples in the rolling hash-rate window
const RATE_WINDOW: usize = 10;

/// Aggregate counters for one mining session
///
/// A read-only snapshot for display purposes; submission decisions never
/// depend on it.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total number of hashes computed this session
    pub total_hashes: u64,
    /// Shares successfully submitted to the pool
    pub shares_submitted: u64,
    /// Blocks found this session
    pub blocks_found: u64,
    /// Work units credited by the pool for work proofs
    pub work_units: u64,
    /// Share/work-proof submissions that failed (logged, never retried)
    pub failed_submissions: u64,
    /// Rolling average hash rate over the last few seconds (hashes/sec)
    pub hashrate: f64,
    /// Seconds since the session started
    pub elapsed_secs: u64,
}

/// Status-change notification for a display/UI collaborator
///
/// Emitted on every orchestrator state transition and at least once per
/// second while mining is active.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// Human-readable description of what the session is doing
    pub message: String,
    /// Snapshot of the session counters at emission time
    pub stats: SessionStats,
}

/// Throughput sampling state for the rolling hash-rate average
///
/// All workers are sampled on a single shared one-second window, so
/// staggered worker report times cannot overstate the aggregate rate.
#[derive(Debug)]
struct RateWindow {
    samples: VecDeque<f64>,
    last_total: u64,
}

/// Atomic counters shared across the session
#[derive(Debug)]
struct StatsInner {
    total_hashes: AtomicU64,
    shares_submitted: AtomicU64,
    blocks_found: AtomicU64,
    work_units: AtomicU64,
    failed_submissions: AtomicU64,
    mining: AtomicBool,
    start_time: Instant,
    window: Mutex<RateWindow>,
}

/// Cloneable handle to the session's statistics
///
/// Workers and the scheduler feed counters through this handle; the
/// reporter thread and the orchestrator read snapshots from it.
#[derive(Debug, Clone)]
pub struct StatsHandle {
    inner: Arc<StatsInner>,
}

impl Default for StatsHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsHandle {
    /// Creates a fresh set of session counters
    pub fn new() -> Self {
        StatsHandle {
            inner: Arc::new(StatsInner {
                total_hashes: AtomicU64::new(0),
                shares_submitted: AtomicU64::new(0),
                blocks_found: AtomicU64::new(0),
                work_units: AtomicU64::new(0),
                failed_submissions: AtomicU64::new(0),
                mining: AtomicBool::new(false),
                start_time: Instant::now(),
                window: Mutex::new(RateWindow {
                    samples: VecDeque::with_capacity(RATE_WINDOW),
                    last_total: 0,
                }),
            }),
        }
    }

    /// Credits computed hashes to the session total
    pub fn add_hashes(&self, count: u64) {
        self.inner.total_hashes.fetch_add(count, Ordering::Relaxed);
    }

    /// Counts one successfully submitted share
    pub fn add_share_submitted(&self) {
        self.inner.shares_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one found block
    pub fn add_block_found(&self) {
        self.inner.blocks_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Credits pool-granted work units
    pub fn add_work_units(&self, units: u64) {
        self.inner.work_units.fetch_add(units, Ordering::Relaxed);
    }

    /// Counts one failed submission
    pub fn add_failed_submission(&self) {
        self.inner.failed_submissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Flags whether a mining round is currently active
    ///
    /// The reporter samples throughput only while this is set.
    pub fn set_mining(&self, mining: bool) {
        self.inner.mining.store(mining, Ordering::Relaxed);
    }

    /// True while a mining round is active
    pub fn is_mining(&self) -> bool {
        self.inner.mining.load(Ordering::Relaxed)
    }

    /// Takes one throughput sample over the shared window
    ///
    /// Pushes the hash-count delta since the previous sample and returns
    /// the rolling average. Called once per second by the reporter thread.
    pub fn sample(&self) -> f64 {
        let total = self.inner.total_hashes.load(Ordering::Relaxed);
        let mut window = self.inner.window.lock().expect("rate window lock poisoned");
        let delta = total.saturating_sub(window.last_total);
        window.last_total = total;

        if window.samples.len() == RATE_WINDOW {
            window.samples.pop_front();
        }
        window.samples.push_back(delta as f64);

        window.samples.iter().sum::<f64>() / window.samples.len() as f64
    }

    /// Current rolling average hash rate without taking a new sample
    pub fn hashrate(&self) -> f64 {
        let window = self.inner.window.lock().expect("rate window lock poisoned");
        if window.samples.is_empty() {
            return 0.0;
        }
        window.samples.iter().sum::<f64>() / window.samples.len() as f64
    }

    /// Snapshot of all counters for display
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            total_hashes: self.inner.total_hashes.load(Ordering::Relaxed),
            shares_submitted: self.inner.shares_submitted.load(Ordering::Relaxed),
            blocks_found: self.inner.blocks_found.load(Ordering::Relaxed),
            work_units: self.inner.work_units.load(Ordering::Relaxed),
            failed_submissions: self.inner.failed_submissions.load(Ordering::Relaxed),
            hashrate: self.hashrate(),
            elapsed_secs: self.inner.start_time.elapsed().as_secs(),
        }
    }
}

/// Periodic statistics reporter
///
/// Spawns a background thread that samples throughput once per second
/// while mining is active, logs the hash rate, and publishes a
/// [`StatusUpdate`] for the display collaborator.
pub struct StatsReporter {
    handle: StatsHandle,
    status_tx: Sender<StatusUpdate>,
    shutdown: Arc<AtomicBool>,
}

impl StatsReporter {
    /// Creates a reporter bound to the session's stats and status channel
    pub fn new(handle: StatsHandle, status_tx: Sender<StatusUpdate>) -> Self {
        StatsReporter {
            handle,
            status_tx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the reporting thread
    pub fn start(&self) {
        let handle = self.handle.clone();
        let status_tx = self.status_tx.clone();
        let shutdown = self.shutdown.clone();

        std::thread::spawn(move || {
            loop {
                std::thread::sleep(Duration::from_secs(1));
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                if !handle.is_mining() {
                    continue;
                }

                let rate = handle.sample();
                let stats = handle.snapshot();
                log::info!(
                    "Hashrate: {:.2} H/s | Total: {} | Shares: {} | Blocks: {}",
                    rate,
                    stats.total_hashes,
                    stats.shares_submitted,
                    stats.blocks_found
                );
                let _ = status_tx.send(StatusUpdate {
                    message: "mining".to_string(),
                    stats,
                });
            }
        });
    }

    /// Signals the reporting thread to exit after its next tick
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_window_is_bounded_and_averaged() {
        let handle = StatsHandle::new();

        // 12 one-second samples of 100 hashes each; window keeps last 10
        for _ in 0..12 {
            handle.add_hashes(100);
            handle.sample();
        }
        assert!((handle.hashrate() - 100.0).abs() < f64::EPSILON);

        // an idle second drags the rolling average down
        handle.sample();
        assert!((handle.hashrate() - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shared_window_counts_each_hash_once() {
        let handle = StatsHandle::new();

        // two "workers" reporting within the same second are one sample
        handle.add_hashes(60);
        handle.add_hashes(40);
        assert!((handle.sample() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stopped_reporter_publishes_no_further_updates() {
        let handle = StatsHandle::new();
        handle.set_mining(true);
        let (tx, rx) = crossbeam_channel::unbounded();
        let reporter = StatsReporter::new(handle, tx);
        reporter.start();

        // at least one tick arrives while running
        assert!(rx.recv_timeout(Duration::from_secs(3)).is_ok());

        reporter.stop();
        // let the thread wake from its current tick and observe the flag,
        // then drain anything that was already in flight
        std::thread::sleep(Duration::from_millis(1500));
        while rx.try_recv().is_ok() {}

        std::thread::sleep(Duration::from_millis(1500));
        assert!(rx.try_recv().is_err(), "reporter kept publishing after stop");
    }

    #[test]
    fn snapshot_reflects_counters() {
        let handle = StatsHandle::new();
        handle.add_hashes(500);
        handle.add_share_submitted();
        handle.add_block_found();
        handle.add_work_units(7);
        handle.add_failed_submission();

        let stats = handle.snapshot();
        assert_eq!(stats.total_hashes, 500);
        assert_eq!(stats.shares_submitted, 1);
        assert_eq!(stats.blocks_found, 1);
        assert_eq!(stats.work_units, 7);
        assert_eq!(stats.failed_submissions, 1);
    }
}
