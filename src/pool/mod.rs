//! Batch pool and worker implementations

pub mod batch_pool;
mod slots;
pub mod worker;

pub use batch_pool::{AssignMode, BatchPool, PoolConfig, PoolSnapshot};
pub use worker::{Worker, WorkerStats, WorkerStatsSnapshot};
