//! Convenient re-exports for common types and traits

pub use crate::core::{
    BoxedJob, ClosureJob, Job, JobDescriptor, PoolError, Result, ShutdownToken,
};
pub use crate::pool::{AssignMode, BatchPool, PoolConfig, WorkerStats};
pub use crate::queue::{JobRing, RingError};
