//! Worker thread implementation

use crate::core::{DefaultHandler, PoolError, Result, ShutdownToken};
use crate::pool::slots::SlotTable;
use crate::queue::JobRing;
use log::{debug, error, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Total number of jobs processed
    pub jobs_processed: AtomicU64,
    /// Total number of jobs that failed
    pub jobs_failed: AtomicU64,
    /// Total number of jobs that panicked
    pub jobs_panicked: AtomicU64,
    /// Total time spent executing jobs (microseconds)
    pub busy_time_us: AtomicU64,
}

/// Point-in-time copy of a worker's counters, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatsSnapshot {
    /// Jobs that completed successfully
    pub jobs_processed: u64,
    /// Jobs that returned an error
    pub jobs_failed: u64,
    /// Jobs that panicked
    pub jobs_panicked: u64,
    /// Total time spent executing jobs (microseconds)
    pub busy_time_us: u64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    fn note_processed(&self, elapsed_us: u64) {
        self.jobs_processed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
    }

    fn note_failed(&self, elapsed_us: u64) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
    }

    fn note_panicked(&self, elapsed_us: u64) {
        self.jobs_panicked.fetch_add(1, Ordering::Relaxed);
        self.busy_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
    }

    /// Get total jobs processed
    pub fn get_jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    /// Get total jobs failed
    pub fn get_jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Get total jobs panicked
    pub fn get_jobs_panicked(&self) -> u64 {
        self.jobs_panicked.load(Ordering::Relaxed)
    }

    /// Get average execution time per job in microseconds
    pub fn get_average_busy_time_us(&self) -> f64 {
        let total = self.busy_time_us.load(Ordering::Relaxed);
        let count = self.jobs_processed.load(Ordering::Relaxed)
            + self.jobs_failed.load(Ordering::Relaxed)
            + self.jobs_panicked.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Take a snapshot of the current counters
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            jobs_processed: self.jobs_processed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_panicked: self.jobs_panicked.load(Ordering::Relaxed),
            busy_time_us: self.busy_time_us.load(Ordering::Relaxed),
        }
    }
}

type DefaultHandlerSlot = Arc<RwLock<Option<Arc<DefaultHandler>>>>;

/// A worker thread bound to exactly one [`JobRing`]
///
/// The worker runs a fetch-execute loop: blocking dequeue, stamp the
/// executing worker ID on the descriptor's slot, run the descriptor's job
/// (or the worker's default handler when the descriptor carries none),
/// record the elapsed time, signal completion. The loop exits when the
/// pool's shutdown token is signalled or the ring is closed and drained.
pub struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<WorkerStats>,
    default_handler: DefaultHandlerSlot,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("running", &self.thread.is_some())
            .field(
                "default_handler",
                &self.default_handler.read().as_ref().map(|_| "<handler>"),
            )
            .finish()
    }
}

impl Worker {
    /// Create and start a new worker bound to `ring`
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if the OS fails to create the thread.
    pub(crate) fn spawn(
        id: usize,
        thread_name: String,
        ring: Arc<JobRing>,
        slots: Arc<SlotTable>,
        default_handler: Option<Arc<DefaultHandler>>,
        shutdown: ShutdownToken,
    ) -> Result<Self> {
        let stats = Arc::new(WorkerStats::new());
        let stats_clone = Arc::clone(&stats);
        let handler_slot: DefaultHandlerSlot = Arc::new(RwLock::new(default_handler));
        let handler_clone = Arc::clone(&handler_slot);

        let thread = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                Self::run(id, ring, slots, handler_clone, shutdown, stats_clone);
            })
            .map_err(|e| PoolError::spawn_with_source(id, "OS thread creation failed", e))?;

        Ok(Self {
            id,
            thread: Some(thread),
            stats,
            default_handler: handler_slot,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Replace the fallback run for payload-less descriptors
    ///
    /// Prefer binding the handler at configuration time via
    /// [`PoolConfig::with_default_handler`]; this runtime path exists so a
    /// ring used as an event-notification channel can be retargeted.
    ///
    /// [`PoolConfig::with_default_handler`]: crate::pool::PoolConfig::with_default_handler
    pub fn set_default_handler(&self, handler: Arc<DefaultHandler>) {
        *self.default_handler.write() = Some(handler);
    }

    /// Join the worker thread
    ///
    /// Only returns once the run loop has exited; callers must close the
    /// ring or signal shutdown first, or this blocks indefinitely.
    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| PoolError::join(self.id, "Worker panicked"))?;
        }
        Ok(())
    }

    /// Release the obligation to join this worker
    ///
    /// The thread keeps running until its ring closes or shutdown is
    /// signalled; its exit is no longer observed by anyone.
    pub fn detach(&mut self) {
        if let Some(thread) = self.thread.take() {
            drop(thread);
        }
    }

    /// Main worker loop
    fn run(
        id: usize,
        ring: Arc<JobRing>,
        slots: Arc<SlotTable>,
        default_handler: DefaultHandlerSlot,
        shutdown: ShutdownToken,
        stats: Arc<WorkerStats>,
    ) {
        debug!("worker {} started", id);

        loop {
            // Checked between jobs; a worker blocked in pop() is woken by
            // the pool closing the ring.
            if shutdown.is_signalled() {
                break;
            }

            let Some(descriptor) = ring.pop() else {
                // Ring closed and drained
                break;
            };

            let (seq, payload) = descriptor.into_parts();
            slots.record_worker(seq, id);

            let started = Instant::now();
            let outcome = match payload {
                Some(mut job) => catch_unwind(AssertUnwindSafe(|| job.execute(id))),
                None => {
                    let handler = default_handler.read().clone();
                    match handler {
                        Some(run) => catch_unwind(AssertUnwindSafe(|| run(id))),
                        // Wakeup with nothing registered: a no-op, not an error
                        None => Ok(Ok(())),
                    }
                }
            };
            let elapsed = started.elapsed();
            slots.record_elapsed(seq, elapsed);
            let elapsed_us = elapsed.as_micros() as u64;

            match outcome {
                Ok(Ok(())) => stats.note_processed(elapsed_us),
                Ok(Err(e)) => {
                    warn!("worker {}: job in slot {} failed: {}", id, seq, e);
                    stats.note_failed(elapsed_us);
                }
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    error!("worker {}: job in slot {} panicked: {}", id, seq, panic_msg);
                    stats.note_panicked(elapsed_us);
                }
            }

            // Always signalled, even for failed or panicked jobs; a wedged
            // in-flight count would deadlock every drain waiter.
            ring.complete();
        }

        debug!(
            "worker {} stopped ({} processed, {} failed, {} panicked)",
            id,
            stats.get_jobs_processed(),
            stats.get_jobs_failed(),
            stats.get_jobs_panicked()
        );
    }
}
