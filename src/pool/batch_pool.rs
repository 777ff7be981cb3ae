//! Batch pool orchestration

use crate::core::{
    BoxedJob, ClosureJob, DefaultHandler, Job, JobDescriptor, PoolError, Result, ShutdownToken,
};
use crate::pool::slots::SlotTable;
use crate::pool::worker::{Worker, WorkerStats, WorkerStatsSnapshot};
use crate::queue::{JobRing, RingError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How submitted jobs are assigned to worker threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignMode {
    /// One shared ring; any idle worker takes the next job.
    ///
    /// The natural choice when jobs have unpredictable cost and load
    /// balancing matters more than placement.
    Dynamic,
    /// One ring per worker; slot `i` always runs on worker `i % threads`.
    ///
    /// Gives a deterministic, reproducible job-to-thread mapping for jobs
    /// whose identity (pinned state, locality) matters more than balance.
    Fixed,
}

/// Configuration for a [`BatchPool`]
#[derive(Clone)]
pub struct PoolConfig {
    /// Number of worker threads (minimum 2)
    pub threads: usize,
    /// Number of preallocated descriptor slots per batch
    pub job_capacity: usize,
    /// Job-to-worker assignment mode
    pub mode: AssignMode,
    /// Thread name prefix
    pub thread_name_prefix: String,
    /// Fallback run for payload-less descriptors, bound at configure time
    default_handler: Option<Arc<DefaultHandler>>,
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("threads", &self.threads)
            .field("job_capacity", &self.job_capacity)
            .field("mode", &self.mode)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field(
                "default_handler",
                &self.default_handler.as_ref().map(|_| "<handler>"),
            )
            .finish()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        let threads = num_cpus::get().max(2);
        Self {
            threads,
            job_capacity: threads * 4,
            mode: AssignMode::Dynamic,
            thread_name_prefix: "worker".to_string(),
            default_handler: None,
        }
    }
}

impl PoolConfig {
    /// Dynamic-assignment configuration: one shared ring of `job_capacity`
    /// descriptors feeding `threads` workers
    #[must_use]
    pub fn dynamic(threads: usize, job_capacity: usize) -> Self {
        Self {
            threads,
            job_capacity,
            mode: AssignMode::Dynamic,
            ..Default::default()
        }
    }

    /// Fixed-assignment configuration: `threads` independent rings, one
    /// worker pinned to each, slot `i` routed to ring `i % threads`
    #[must_use]
    pub fn fixed(threads: usize, job_capacity: usize) -> Self {
        Self {
            threads,
            job_capacity,
            mode: AssignMode::Fixed,
            ..Default::default()
        }
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Bind the fallback run for payload-less descriptors
    ///
    /// Every worker of the configured pool starts with this handler; a
    /// descriptor submitted via [`BatchPool::submit_default`] wakes a worker
    /// and runs it.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_default_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(usize) -> Result<()> + Send + Sync + 'static,
    {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.threads < 2 {
            return Err(PoolError::invalid_config(
                "threads",
                "thread count must be at least 2",
            ));
        }
        if self.job_capacity < self.threads {
            return Err(PoolError::invalid_config(
                "job_capacity",
                "job capacity must be at least the thread count",
            ));
        }
        Ok(())
    }

    /// Ring capacity for one worker's private ring in fixed mode
    fn fixed_ring_capacity(&self) -> usize {
        self.job_capacity.div_ceil(self.threads)
    }
}

/// Point-in-time view of a pool's configuration and counters
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    /// Configured worker count (0 when unconfigured)
    pub threads: usize,
    /// Configured descriptor slot count (0 when unconfigured)
    pub job_capacity: usize,
    /// Assignment mode of the live configuration
    pub mode: Option<AssignMode>,
    /// Descriptors currently buffered across all rings
    pub queued_jobs: usize,
    /// Slots consumed in the current batch
    pub batch_cursor: usize,
    /// Per-worker counters
    pub workers: Vec<WorkerStatsSnapshot>,
}

/// A fixed-size worker pool with preallocated descriptor slots and batch
/// completion semantics
///
/// The pool owns its rings and workers. Submission writes into the next
/// descriptor slot and routes it to a ring chosen by the assignment mode;
/// when all `job_capacity` slots of the current batch are taken, the next
/// submission first blocks until the batch drains. [`wait_for_batch`]
/// establishes the batch boundary: when it returns, every job submitted
/// since the previous boundary has finished, and the slot instrumentation
/// ([`job_worker_id`], [`job_elapsed_time`]) for those slots is stable.
///
/// Submission takes `&mut self`: one submitter owns the slot cursor, which
/// is what makes slot reuse safe to check at compile time.
///
/// # Example
///
/// ```rust
/// use jobring::pool::BatchPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # fn main() -> jobring::core::Result<()> {
/// let mut pool = BatchPool::dynamic(2, 4)?;
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..4 {
///     let counter = Arc::clone(&counter);
///     pool.execute(move |_worker| {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     })?;
/// }
///
/// pool.wait_for_batch();
/// assert_eq!(counter.load(Ordering::SeqCst), 4);
/// # Ok(())
/// # }
/// ```
///
/// [`wait_for_batch`]: Self::wait_for_batch
/// [`job_worker_id`]: Self::job_worker_id
/// [`job_elapsed_time`]: Self::job_elapsed_time
pub struct BatchPool {
    config: Option<PoolConfig>,
    rings: Vec<Arc<JobRing>>,
    workers: Vec<Worker>,
    slots: Arc<SlotTable>,
    cursor: usize,
    shutdown: ShutdownToken,
}

impl std::fmt::Debug for BatchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPool")
            .field("config", &self.config)
            .field("rings", &self.rings)
            .field("workers", &self.workers)
            .field("batch_cursor", &self.cursor)
            .finish()
    }
}

impl BatchPool {
    /// Create an unconfigured pool
    ///
    /// Submission fails with [`PoolError::NotConfigured`] until one of the
    /// configure calls succeeds.
    pub fn new() -> Self {
        Self {
            config: None,
            rings: Vec::new(),
            workers: Vec::new(),
            slots: Arc::new(SlotTable::new(0)),
            cursor: 0,
            shutdown: ShutdownToken::new(),
        }
    }

    /// Create a pool in dynamic assignment mode
    pub fn dynamic(threads: usize, job_capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::dynamic(threads, job_capacity))
    }

    /// Create a pool in fixed assignment mode
    pub fn fixed(threads: usize, job_capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::fixed(threads, job_capacity))
    }

    /// Create a pool from a full configuration
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let mut pool = Self::new();
        pool.apply(config)?;
        Ok(pool)
    }

    /// (Re)configure in dynamic mode: one shared ring of `job_capacity`
    /// descriptors, `threads` workers competing for it
    ///
    /// Any prior configuration is fully torn down first: its workers are
    /// stopped and joined and its rings dropped before the new pool is
    /// built. Safe to call repeatedly.
    pub fn configure_dynamic(&mut self, threads: usize, job_capacity: usize) -> Result<()> {
        self.apply(PoolConfig::dynamic(threads, job_capacity))
    }

    /// (Re)configure in fixed mode: `threads` independent rings each holding
    /// `ceil(job_capacity / threads)` descriptors, one worker per ring
    ///
    /// Any prior configuration is fully torn down first. Safe to call
    /// repeatedly.
    pub fn configure_fixed(&mut self, threads: usize, job_capacity: usize) -> Result<()> {
        self.apply(PoolConfig::fixed(threads, job_capacity))
    }

    /// Apply a configuration, tearing down any prior one
    ///
    /// All-or-nothing: if any worker fails to spawn, the partially built
    /// pool is unwound and the pool is left unconfigured.
    pub fn apply(&mut self, config: PoolConfig) -> Result<()> {
        config.validate()?;
        self.stop(false);

        let rings: Vec<Arc<JobRing>> = match config.mode {
            AssignMode::Dynamic => vec![Arc::new(JobRing::new(config.job_capacity))],
            AssignMode::Fixed => (0..config.threads)
                .map(|_| Arc::new(JobRing::new(config.fixed_ring_capacity())))
                .collect(),
        };
        let slots = Arc::new(SlotTable::new(config.job_capacity));
        let shutdown = ShutdownToken::new();

        let mut workers: Vec<Worker> = Vec::with_capacity(config.threads);
        for id in 0..config.threads {
            let ring = match config.mode {
                AssignMode::Dynamic => Arc::clone(&rings[0]),
                AssignMode::Fixed => Arc::clone(&rings[id]),
            };
            let spawned = Worker::spawn(
                id,
                format!("{}-{}", config.thread_name_prefix, id),
                ring,
                Arc::clone(&slots),
                config.default_handler.clone(),
                shutdown.clone(),
            );
            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Unwind the partial pool; nothing of this configure
                    // attempt survives
                    shutdown.signal();
                    for ring in &rings {
                        ring.close();
                    }
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(e);
                }
            }
        }

        debug!(
            "pool configured: {:?} mode, {} threads, {} slots",
            config.mode, config.threads, config.job_capacity
        );

        self.config = Some(config);
        self.rings = rings;
        self.workers = workers;
        self.slots = slots;
        self.cursor = 0;
        self.shutdown = shutdown;
        Ok(())
    }

    /// Submit a job into the next descriptor slot
    ///
    /// Returns the slot index the job occupies within the current batch.
    /// When the batch is saturated (all `job_capacity` slots submitted since
    /// the last [`wait_for_batch`](Self::wait_for_batch)), this first blocks
    /// until the batch drains, then starts a new batch - bounded memory in
    /// exchange for a blocking submission path.
    pub fn submit<J: Job + 'static>(&mut self, job: J) -> Result<usize> {
        self.submit_payload(Some(Box::new(job)))
    }

    /// Submit a closure as a job
    ///
    /// The closure receives the ID of the worker that executes it.
    pub fn execute<F>(&mut self, f: F) -> Result<usize>
    where
        F: FnOnce(usize) -> Result<()> + Send + 'static,
    {
        self.submit(ClosureJob::new(f))
    }

    /// Submit a payload-less wakeup descriptor
    ///
    /// The worker that dequeues it runs its default handler, letting a ring
    /// double as an event-notification channel. A worker with no handler
    /// registered treats the wakeup as a no-op.
    pub fn submit_default(&mut self) -> Result<usize> {
        self.submit_payload(None)
    }

    fn submit_payload(&mut self, payload: Option<BoxedJob>) -> Result<usize> {
        let (job_capacity, threads, mode) = {
            let config = self.config.as_ref().ok_or(PoolError::NotConfigured)?;
            (config.job_capacity, config.threads, config.mode)
        };

        // Batch saturated: block until every outstanding job finishes, then
        // reuse the slots from the top
        if self.cursor == job_capacity {
            self.wait_for_batch();
        }

        let seq = self.cursor;
        self.slots.reset(seq);
        let descriptor = match payload {
            Some(job) => JobDescriptor::new(seq, job),
            None => JobDescriptor::wakeup(seq),
        };

        let ring = match mode {
            AssignMode::Dynamic => &self.rings[0],
            AssignMode::Fixed => &self.rings[seq % threads],
        };
        ring.push(descriptor).map_err(|e| match e {
            RingError::Full(_) => PoolError::ring_full(ring.len(), ring.capacity()),
            RingError::Closed(_) => PoolError::NotConfigured,
        })?;

        self.cursor += 1;
        Ok(seq)
    }

    /// Block until every job submitted since the previous batch boundary has
    /// finished, then reset the slot cursor
    ///
    /// Waits on every live ring (one in dynamic mode, all of them in fixed
    /// mode). Returns immediately when nothing is outstanding. Establishes a
    /// happens-before edge: every effect of every job in the batch is
    /// visible once this returns.
    pub fn wait_for_batch(&mut self) {
        for ring in &self.rings {
            ring.wait_drained();
        }
        self.cursor = 0;
    }

    /// Wall time the job in `slot` took to execute
    ///
    /// Meaningful only after a [`wait_for_batch`](Self::wait_for_batch) that
    /// covered the slot; `None` when the slot has not run yet.
    pub fn job_elapsed_time(&self, slot: usize) -> Result<Option<Duration>> {
        self.check_slot(slot)?;
        Ok(self.slots.elapsed(slot))
    }

    /// ID of the worker that executed the job in `slot`
    ///
    /// Meaningful only after a [`wait_for_batch`](Self::wait_for_batch) that
    /// covered the slot; `None` when the slot has not run yet.
    pub fn job_worker_id(&self, slot: usize) -> Result<Option<usize>> {
        self.check_slot(slot)?;
        Ok(self.slots.worker_id(slot))
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        let config = self.config.as_ref().ok_or(PoolError::NotConfigured)?;
        if slot >= config.job_capacity {
            return Err(PoolError::slot_out_of_range(slot, config.job_capacity));
        }
        Ok(())
    }

    /// Replace the default handler of one worker
    ///
    /// The handler runs whenever that worker dequeues a payload-less
    /// descriptor. Prefer binding a handler at configure time via
    /// [`PoolConfig::with_default_handler`]; this runtime path exists for
    /// retargeting a ring used as an event-notification channel.
    ///
    /// # Errors
    ///
    /// [`PoolError::WorkerOutOfRange`] if `worker_id` is not a live worker.
    pub fn register_default<F>(&mut self, worker_id: usize, handler: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Send + Sync + 'static,
    {
        if self.config.is_none() {
            return Err(PoolError::NotConfigured);
        }
        let threads = self.workers.len();
        let worker = self
            .workers
            .get(worker_id)
            .ok_or_else(|| PoolError::worker_out_of_range(worker_id, threads))?;
        worker.set_default_handler(Arc::new(handler));
        Ok(())
    }

    /// Whether the pool has a live configuration
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Configured worker count, 0 when unconfigured
    pub fn thread_count(&self) -> usize {
        self.config.as_ref().map_or(0, |c| c.threads)
    }

    /// Configured descriptor slot count, 0 when unconfigured
    pub fn job_capacity(&self) -> usize {
        self.config.as_ref().map_or(0, |c| c.job_capacity)
    }

    /// Assignment mode of the live configuration
    pub fn mode(&self) -> Option<AssignMode> {
        self.config.as_ref().map(|c| c.mode)
    }

    /// Descriptors currently buffered across all rings (approximate)
    pub fn queued_jobs(&self) -> usize {
        self.rings.iter().map(|r| r.len()).sum()
    }

    /// Get statistics for all workers
    pub fn worker_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.workers.iter().map(|w| w.stats()).collect()
    }

    /// Get total jobs processed across all workers
    pub fn total_jobs_processed(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.stats().get_jobs_processed())
            .sum()
    }

    /// Take a serializable snapshot of the pool state
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            threads: self.thread_count(),
            job_capacity: self.job_capacity(),
            mode: self.mode(),
            queued_jobs: self.queued_jobs(),
            batch_cursor: self.cursor,
            workers: self.workers.iter().map(|w| w.stats().snapshot()).collect(),
        }
    }

    /// Gracefully shut the pool down
    ///
    /// Rings are closed so workers drain every buffered descriptor before
    /// exiting, then all worker threads are joined. The pool is left
    /// unconfigured and can be configured again.
    pub fn shutdown(&mut self) {
        self.stop(true);
    }

    /// Stop the current configuration
    ///
    /// `drain` decides whether workers finish buffered descriptors first
    /// (graceful shutdown) or exit after their current job (reconfigure and
    /// drop paths).
    fn stop(&mut self, drain: bool) {
        if self.workers.is_empty() && self.rings.is_empty() {
            return;
        }

        if !drain {
            self.shutdown.signal();
        }
        for ring in &self.rings {
            ring.close();
        }
        for worker in self.workers.drain(..) {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!("failed to join worker {}: {}", id, e);
            }
        }
        self.rings.clear();
        self.config = None;
        self.slots = Arc::new(SlotTable::new(0));
        self.cursor = 0;

        debug!("pool stopped (drain={})", drain);
    }
}

impl Default for BatchPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchPool {
    fn drop(&mut self) {
        self.stop(false);
    }
}
