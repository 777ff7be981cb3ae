//! Bounded FIFO descriptor ring with drain signaling.

use crate::core::JobDescriptor;
use parking_lot::{Condvar, Mutex};
use std::fmt;

/// Errors returned by [`JobRing::push`].
///
/// Both variants hand the rejected descriptor back to the caller so it can
/// be retried or handled differently.
#[derive(Debug)]
pub enum RingError {
    /// Ring is at capacity
    Full(JobDescriptor),
    /// Ring has been closed and accepts no new descriptors
    Closed(JobDescriptor),
}

impl RingError {
    /// Recover the rejected descriptor
    pub fn into_descriptor(self) -> JobDescriptor {
        match self {
            RingError::Full(descriptor) | RingError::Closed(descriptor) => descriptor,
        }
    }
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::Full(_) => write!(f, "ring is full"),
            RingError::Closed(_) => write!(f, "ring is closed"),
        }
    }
}

impl std::error::Error for RingError {}

/// Result type for ring operations.
pub type RingResult<T> = std::result::Result<T, RingError>;

struct RingState {
    slots: Box<[Option<JobDescriptor>]>,
    read_at: usize,
    write_at: usize,
    occupancy: usize,
    in_flight: usize,
    closed: bool,
}

impl RingState {
    fn drained(&self) -> bool {
        self.occupancy == 0 && self.in_flight == 0
    }

    fn take_front(&mut self, capacity: usize) -> JobDescriptor {
        let descriptor = self.slots[self.read_at]
            .take()
            .expect("occupied slot at read cursor");
        self.read_at = (self.read_at + 1) % capacity;
        self.occupancy -= 1;
        // Counted as in flight inside the same critical section as the
        // removal, so a drain waiter can never observe the descriptor as
        // neither queued nor executing.
        self.in_flight += 1;
        descriptor
    }
}

/// A fixed-capacity FIFO hand-off ring between job submitters and workers.
///
/// The ring is the pool's sole synchronization primitive: a circular buffer
/// of job descriptors guarded by one mutex and two condition variables, one
/// waking consumers when a descriptor arrives and one waking drain waiters
/// when the ring has no buffered and no in-flight work left.
///
/// Enqueueing is non-blocking by design: a full ring rejects the descriptor
/// and returns it, and the caller applies its own backpressure. Dequeueing
/// blocks until a descriptor arrives or the ring is closed.
///
/// # Example
///
/// ```rust
/// use jobring::core::JobDescriptor;
/// use jobring::queue::{JobRing, RingError};
///
/// let ring = JobRing::new(2);
///
/// ring.push(JobDescriptor::wakeup(0)).unwrap();
/// ring.push(JobDescriptor::wakeup(1)).unwrap();
///
/// // Ring is now full - push hands the descriptor back
/// match ring.push(JobDescriptor::wakeup(2)) {
///     Err(RingError::Full(descriptor)) => assert_eq!(descriptor.seq(), 2),
///     _ => panic!("expected Full error"),
/// }
/// ```
pub struct JobRing {
    capacity: usize,
    state: Mutex<RingState>,
    job_available: Condvar,
    drained: Condvar,
}

impl JobRing {
    /// Creates a new ring with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();
        Self {
            capacity,
            state: Mutex::new(RingState {
                slots: slots.into_boxed_slice(),
                read_at: 0,
                write_at: 0,
                occupancy: 0,
                in_flight: 0,
                closed: false,
            }),
            job_available: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Returns the maximum number of descriptors this ring can buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueues a descriptor at the write cursor without blocking.
    ///
    /// Wakes exactly one blocked consumer on success.
    ///
    /// # Errors
    ///
    /// - [`RingError::Full`] if occupancy equals capacity; the descriptor is
    ///   returned and the ring is unchanged
    /// - [`RingError::Closed`] if the ring has been closed
    pub fn push(&self, descriptor: JobDescriptor) -> RingResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(RingError::Closed(descriptor));
        }
        if state.occupancy == self.capacity {
            return Err(RingError::Full(descriptor));
        }
        let write_at = state.write_at;
        state.slots[write_at] = Some(descriptor);
        state.write_at = (write_at + 1) % self.capacity;
        state.occupancy += 1;
        self.job_available.notify_one();
        Ok(())
    }

    /// Dequeues the descriptor at the read cursor, blocking while empty.
    ///
    /// The dequeued descriptor is counted as in flight until the consumer
    /// calls [`complete()`](Self::complete) for it.
    ///
    /// Returns `None` only when the ring is closed and empty; a consumer
    /// blocked here is woken by [`close()`](Self::close) so it can observe
    /// shutdown instead of sleeping forever.
    pub fn pop(&self) -> Option<JobDescriptor> {
        let mut state = self.state.lock();
        while state.occupancy == 0 {
            if state.closed {
                return None;
            }
            self.job_available.wait(&mut state);
        }
        Some(state.take_front(self.capacity))
    }

    /// Dequeues the descriptor at the read cursor, or returns `None`
    /// immediately when the ring is empty.
    pub fn try_pop(&self) -> Option<JobDescriptor> {
        let mut state = self.state.lock();
        if state.occupancy == 0 {
            return None;
        }
        Some(state.take_front(self.capacity))
    }

    /// Signals that a previously dequeued descriptor finished executing.
    ///
    /// When the last in-flight descriptor completes and the ring is empty,
    /// all drain waiters are woken.
    ///
    /// # Panics
    ///
    /// Panics if called more times than descriptors were dequeued; the
    /// in-flight count can never go negative.
    pub fn complete(&self) {
        let mut state = self.state.lock();
        assert!(
            state.in_flight > 0,
            "complete() without a matching dequeue"
        );
        state.in_flight -= 1;
        if state.drained() {
            self.drained.notify_all();
        }
    }

    /// Blocks until the ring has no buffered and no in-flight descriptors.
    ///
    /// Returns immediately when the ring is already drained; safe to call
    /// repeatedly.
    pub fn wait_drained(&self) {
        let mut state = self.state.lock();
        while !state.drained() {
            self.drained.wait(&mut state);
        }
    }

    /// Closes the ring, preventing new descriptors from being enqueued.
    ///
    /// Descriptors already buffered can still be dequeued; consumers blocked
    /// in [`pop()`](Self::pop) are woken.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.job_available.notify_all();
    }

    /// Returns `true` if the ring has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the current number of buffered descriptors.
    pub fn len(&self) -> usize {
        self.state.lock().occupancy
    }

    /// Returns `true` if no descriptors are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of dequeued-but-unfinished descriptors.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }
}

impl fmt::Debug for JobRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("JobRing")
            .field("capacity", &self.capacity)
            .field("occupancy", &state.occupancy)
            .field("in_flight", &state.in_flight)
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn wakeup(seq: usize) -> JobDescriptor {
        JobDescriptor::wakeup(seq)
    }

    #[test]
    fn test_push_pop_fifo() {
        let ring = JobRing::new(4);
        for seq in 0..4 {
            ring.push(wakeup(seq)).unwrap();
        }
        for seq in 0..4 {
            assert_eq!(ring.pop().unwrap().seq(), seq);
            ring.complete();
        }
    }

    #[test]
    fn test_capacity() {
        let ring = JobRing::new(5);
        assert_eq!(ring.capacity(), 5);
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        let _ = JobRing::new(0);
    }

    #[test]
    fn test_push_full_returns_descriptor() {
        let ring = JobRing::new(2);
        ring.push(wakeup(0)).unwrap();
        ring.push(wakeup(1)).unwrap();

        match ring.push(wakeup(2)) {
            Err(RingError::Full(descriptor)) => assert_eq!(descriptor.seq(), 2),
            _ => panic!("expected Full error"),
        }
        // Rejection leaves the ring unchanged
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let ring = JobRing::new(3);
        for seq in 0..10 {
            let _ = ring.push(wakeup(seq));
            assert!(ring.len() <= ring.capacity());
        }
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_cursors_wrap_around() {
        let ring = JobRing::new(2);
        // Three full fill/drain cycles walk the cursors past the capacity
        for cycle in 0..3 {
            ring.push(wakeup(cycle * 2)).unwrap();
            ring.push(wakeup(cycle * 2 + 1)).unwrap();
            assert_eq!(ring.pop().unwrap().seq(), cycle * 2);
            assert_eq!(ring.pop().unwrap().seq(), cycle * 2 + 1);
            ring.complete();
            ring.complete();
        }
    }

    #[test]
    fn test_try_pop_empty() {
        let ring = JobRing::new(4);
        assert!(ring.try_pop().is_none());

        ring.push(wakeup(0)).unwrap();
        assert_eq!(ring.try_pop().unwrap().seq(), 0);
        ring.complete();
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let ring = Arc::new(JobRing::new(1));

        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let descriptor = ring.pop().unwrap();
                ring.complete();
                descriptor.seq()
            })
        };

        // Give the consumer a chance to block
        thread::sleep(Duration::from_millis(20));
        ring.push(wakeup(7)).unwrap();

        assert_eq!(consumer.join().unwrap(), 7);
    }

    #[test]
    fn test_close_wakes_blocked_pop() {
        let ring = Arc::new(JobRing::new(1));

        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.pop().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        ring.close();

        assert!(consumer.join().unwrap());
    }

    #[test]
    fn test_push_after_close_rejected() {
        let ring = JobRing::new(2);
        ring.close();
        assert!(ring.is_closed());

        match ring.push(wakeup(0)) {
            Err(RingError::Closed(_)) => {}
            _ => panic!("expected Closed error"),
        }
    }

    #[test]
    fn test_pop_drains_buffered_after_close() {
        let ring = JobRing::new(2);
        ring.push(wakeup(0)).unwrap();
        ring.push(wakeup(1)).unwrap();
        ring.close();

        // Buffered descriptors survive the close
        assert_eq!(ring.pop().unwrap().seq(), 0);
        assert_eq!(ring.pop().unwrap().seq(), 1);
        assert!(ring.pop().is_none());
        ring.complete();
        ring.complete();
    }

    #[test]
    fn test_wait_drained_returns_immediately_when_idle() {
        let ring = JobRing::new(4);
        // Nothing queued, nothing in flight
        ring.wait_drained();
    }

    #[test]
    fn test_wait_drained_covers_in_flight_work() {
        let ring = Arc::new(JobRing::new(1));
        ring.push(wakeup(0)).unwrap();

        let worker = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let _descriptor = ring.pop().unwrap();
                // Ring is now empty but the descriptor is still in flight
                thread::sleep(Duration::from_millis(50));
                ring.complete();
            })
        };

        thread::sleep(Duration::from_millis(10));
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.in_flight(), 1);

        // Must not return before complete() runs
        ring.wait_drained();
        assert_eq!(ring.in_flight(), 0);

        worker.join().unwrap();
    }

    #[test]
    fn test_drain_stress_many_producers_one_consumer() {
        let ring = Arc::new(JobRing::new(8));
        let producers = 4;
        let per_producer = 50;

        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let mut consumed = 0;
                while consumed < producers * per_producer {
                    if ring.pop().is_some() {
                        consumed += 1;
                        ring.complete();
                    }
                }
                consumed
            })
        };

        let mut handles = Vec::new();
        for p in 0..producers {
            let ring = Arc::clone(&ring);
            handles.push(thread::spawn(move || {
                for i in 0..per_producer {
                    let mut descriptor = wakeup(p * per_producer + i);
                    loop {
                        match ring.push(descriptor) {
                            Ok(()) => break,
                            Err(RingError::Full(rejected)) => {
                                descriptor = rejected;
                                thread::yield_now();
                            }
                            Err(RingError::Closed(_)) => panic!("ring closed"),
                        }
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(consumer.join().unwrap(), producers * per_producer);

        ring.wait_drained();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.in_flight(), 0);
    }

    #[test]
    fn test_drain_stress_one_producer_many_consumers() {
        let ring = Arc::new(JobRing::new(8));
        let total = 200;

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let ring = Arc::clone(&ring);
            consumers.push(thread::spawn(move || {
                let mut consumed = 0;
                while let Some(_descriptor) = ring.pop() {
                    // Hold the descriptor in flight briefly
                    if fastrand::bool() {
                        thread::yield_now();
                    }
                    ring.complete();
                    consumed += 1;
                }
                consumed
            }));
        }

        for i in 0..total {
            let mut descriptor = wakeup(i);
            loop {
                match ring.push(descriptor) {
                    Ok(()) => break,
                    Err(RingError::Full(rejected)) => {
                        descriptor = rejected;
                        thread::yield_now();
                    }
                    Err(RingError::Closed(_)) => panic!("ring closed"),
                }
            }
        }

        ring.wait_drained();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.in_flight(), 0);

        ring.close();
        let consumed: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
        assert_eq!(consumed, total);
    }
}
