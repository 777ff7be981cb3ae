//! Cooperative shutdown signaling for worker loops
//!
//! Worker threads have no business being killed mid-loop. Each worker checks
//! a shared [`ShutdownToken`] at the top of every loop iteration, and a
//! closed ring wakes any worker blocked in a dequeue so the signal is always
//! observed promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clonable stop flag shared between a pool and its workers
///
/// Signaling is one-way and idempotent: once signalled, a token stays
/// signalled for its lifetime. Clones observe the same state.
///
/// # Example
///
/// ```rust
/// use jobring::core::ShutdownToken;
///
/// let token = ShutdownToken::new();
/// let worker_view = token.clone();
///
/// assert!(!worker_view.is_signalled());
/// token.signal();
/// assert!(worker_view.is_signalled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    signalled: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Create a new token in the not-signalled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn signal(&self) {
        self.signalled.store(true, Ordering::Release);
    }

    /// Check whether shutdown has been requested
    ///
    /// Lock-free, suitable for checking once per loop iteration.
    #[inline]
    pub fn is_signalled(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }
}
