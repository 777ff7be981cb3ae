//! Core types and traits for the pool runtime

pub mod error;
pub mod job;
pub mod shutdown;

pub use error::{PoolError, Result};
pub use job::{BoxedJob, ClosureJob, DefaultHandler, Job, JobDescriptor};
pub use shutdown::ShutdownToken;
