//! # jobring
//!
//! A fixed-size worker pool built around bounded descriptor rings and batch
//! completion semantics.
//!
//! ## Features
//!
//! - **Bounded job rings**: fixed-capacity FIFO hand-off with blocking
//!   dequeue and drain signaling, built on parking_lot primitives
//! - **Two assignment modes**: one shared ring any idle worker pulls from,
//!   or one ring per worker with a deterministic slot-to-worker mapping
//! - **Batch discipline**: a preallocated set of descriptor slots is reused
//!   batch after batch; submission blocks when the batch is saturated, so
//!   memory stays bounded no matter how many jobs flow through
//! - **Per-slot introspection**: which worker ran each slot and how long it
//!   took, stable once the covering batch wait returns
//! - **Clean shutdown**: workers exit cooperatively via a shutdown token and
//!   ring closure, draining or abandoning buffered work as the caller asks
//!
//! ## Quick Start
//!
//! ```rust
//! use jobring::prelude::*;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! // Four workers sharing one ring of eight descriptor slots
//! let mut pool = BatchPool::dynamic(4, 8)?;
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..8 {
//!     let counter = Arc::clone(&counter);
//!     pool.execute(move |_worker_id| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     })?;
//! }
//!
//! // Block until every job of the batch has finished
//! pool.wait_for_batch();
//! assert_eq!(counter.load(Ordering::SeqCst), 8);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pinned Assignment
//!
//! ```rust
//! use jobring::prelude::*;
//!
//! # fn main() -> Result<()> {
//! // Slot i always runs on worker i % 2 - reproducible placement for jobs
//! // with per-worker state
//! let mut pool = BatchPool::fixed(2, 8)?;
//!
//! for _ in 0..8 {
//!     pool.execute(|_worker_id| Ok(()))?;
//! }
//! pool.wait_for_batch();
//!
//! for slot in 0..8 {
//!     assert_eq!(pool.job_worker_id(slot)?, Some(slot % 2));
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audio;
pub mod core;
pub mod pool;
pub mod prelude;
pub mod queue;

pub use crate::core::{
    BoxedJob, ClosureJob, Job, JobDescriptor, PoolError, Result, ShutdownToken,
};
pub use crate::pool::{AssignMode, BatchPool, PoolConfig, WorkerStats};
pub use crate::queue::JobRing;
