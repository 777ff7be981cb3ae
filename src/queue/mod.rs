//! Bounded descriptor ring used to hand jobs to workers.
//!
//! A [`JobRing`] is a fixed-capacity circular buffer of job descriptors
//! guarded by a mutex and two condition variables. It is the only
//! synchronization primitive in the pool: submitters push descriptors
//! without blocking (a full ring rejects and returns the descriptor),
//! workers pop with blocking semantics, and batch callers wait for the ring
//! to drain - no buffered descriptors and no dequeued-but-unfinished ones.
//!
//! Ordering is FIFO within one ring. A pool in fixed-assignment mode runs
//! several independent rings, with no ordering guarantee across them.

mod ring;

pub use ring::{JobRing, RingError, RingResult};
