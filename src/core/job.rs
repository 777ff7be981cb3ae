//! Job trait and descriptor types

use crate::core::error::Result;
use std::fmt;

/// A trait representing a unit of work to be executed by a pool worker
///
/// The executing worker passes its own ID to the job, so a job can address
/// per-worker collaborator state (the classic use is one codec instance per
/// worker, indexed by `worker_id`).
pub trait Job: Send {
    /// Execute the job on the given worker
    ///
    /// # Errors
    ///
    /// Returns an error if the job execution fails
    fn execute(&mut self, worker_id: usize) -> Result<()>;

    /// Get the job's type name for debugging and statistics
    fn job_type(&self) -> &str {
        "Job"
    }
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.job_type())
    }
}

/// A boxed job that can be sent across threads
pub type BoxedJob = Box<dyn Job>;

/// Fallback behavior a worker runs for descriptors that carry no job.
///
/// Unlike [`Job::execute`], a default handler may run many times, once per
/// payload-less descriptor the worker dequeues.
pub type DefaultHandler = dyn Fn(usize) -> Result<()> + Send + Sync;

/// Helper to create a job from a closure
pub struct ClosureJob<F>
where
    F: FnOnce(usize) -> Result<()> + Send,
{
    closure: Option<F>,
    name: String,
}

impl<F> ClosureJob<F>
where
    F: FnOnce(usize) -> Result<()> + Send,
{
    /// Create a new closure job
    pub fn new(closure: F) -> Self {
        Self {
            closure: Some(closure),
            name: "ClosureJob".to_string(),
        }
    }

    /// Create a new closure job with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure: Some(closure),
            name: name.into(),
        }
    }
}

impl<F> Job for ClosureJob<F>
where
    F: FnOnce(usize) -> Result<()> + Send,
{
    fn execute(&mut self, worker_id: usize) -> Result<()> {
        if let Some(closure) = self.closure.take() {
            closure(worker_id)
        } else {
            // Closure already executed, return error instead of silently succeeding
            Err(crate::core::PoolError::other(
                "ClosureJob already executed - cannot execute twice",
            ))
        }
    }

    fn job_type(&self) -> &str {
        &self.name
    }
}

/// One schedulable unit of work flowing through a [`JobRing`]
///
/// A descriptor pairs a slot index with an optional job payload. A
/// descriptor without a payload is a wakeup: the dequeuing worker runs its
/// registered default handler instead, which lets a ring double as an
/// event-notification channel.
///
/// Descriptors are moved through the ring, never shared: the submitter gives
/// up ownership on enqueue and the executing worker consumes the descriptor.
/// Slot indices only repeat after the pool has confirmed the previous batch
/// drained, so a slot's instrumentation is stable once its batch completes.
///
/// [`JobRing`]: crate::queue::JobRing
#[derive(Debug)]
pub struct JobDescriptor {
    seq: usize,
    payload: Option<BoxedJob>,
}

impl JobDescriptor {
    /// Create a descriptor carrying a job payload
    pub fn new(seq: usize, job: BoxedJob) -> Self {
        Self {
            seq,
            payload: Some(job),
        }
    }

    /// Create a payload-less wakeup descriptor
    pub fn wakeup(seq: usize) -> Self {
        Self { seq, payload: None }
    }

    /// Slot index of this descriptor within the current batch
    pub fn seq(&self) -> usize {
        self.seq
    }

    /// Whether this descriptor carries a job payload
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Consume the descriptor, yielding its slot index and payload
    pub fn into_parts(self) -> (usize, Option<BoxedJob>) {
        (self.seq, self.payload)
    }
}
