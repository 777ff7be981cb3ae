//! Per-slot execution instrumentation.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

const WORKER_UNSET: usize = usize::MAX;
const ELAPSED_UNSET: u64 = u64::MAX;

struct SlotCell {
    worker: AtomicUsize,
    elapsed_us: AtomicU64,
}

impl SlotCell {
    fn new() -> Self {
        Self {
            worker: AtomicUsize::new(WORKER_UNSET),
            elapsed_us: AtomicU64::new(ELAPSED_UNSET),
        }
    }
}

/// Instrumentation records for the pool's preallocated descriptor slots.
///
/// Workers stamp the executing worker ID and the wall time a job took into
/// the cell matching the descriptor's slot index. The pool resets a cell
/// when its slot is reused for a new submission.
///
/// Cells use relaxed atomics: the batch-drain handshake on the ring's mutex
/// already orders a worker's stamps before any read that follows
/// `wait_for_batch`, which is the only point the values are meaningful.
pub(crate) struct SlotTable {
    cells: Box<[SlotCell]>,
}

impl SlotTable {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            cells: (0..capacity).map(|_| SlotCell::new()).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    /// Clear a slot's records ahead of its reuse by a new submission.
    pub(crate) fn reset(&self, slot: usize) {
        let cell = &self.cells[slot];
        cell.worker.store(WORKER_UNSET, Ordering::Relaxed);
        cell.elapsed_us.store(ELAPSED_UNSET, Ordering::Relaxed);
    }

    pub(crate) fn record_worker(&self, slot: usize, worker_id: usize) {
        self.cells[slot].worker.store(worker_id, Ordering::Relaxed);
    }

    pub(crate) fn record_elapsed(&self, slot: usize, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX - 1);
        self.cells[slot].elapsed_us.store(micros, Ordering::Relaxed);
    }

    /// Worker that executed the slot's job, if it has run
    pub(crate) fn worker_id(&self, slot: usize) -> Option<usize> {
        match self.cells[slot].worker.load(Ordering::Relaxed) {
            WORKER_UNSET => None,
            id => Some(id),
        }
    }

    /// Wall time the slot's job took, if it has run
    pub(crate) fn elapsed(&self, slot: usize) -> Option<Duration> {
        match self.cells[slot].elapsed_us.load(Ordering::Relaxed) {
            ELAPSED_UNSET => None,
            micros => Some(Duration::from_micros(micros)),
        }
    }
}
