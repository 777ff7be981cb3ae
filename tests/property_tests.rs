//! Property-based tests for jobring using proptest

use jobring::prelude::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// PoolConfig Tests
// ============================================================================

proptest! {
    /// Valid thread/capacity pairs always validate
    #[test]
    fn test_config_accepts_valid_shapes(
        threads in 2usize..16,
        extra in 0usize..64
    ) {
        let config = PoolConfig::dynamic(threads, threads + extra);
        prop_assert!(config.validate().is_ok());
    }

    /// Fewer than two threads never validates
    #[test]
    fn test_config_rejects_small_thread_counts(
        threads in 0usize..2,
        capacity in 1usize..64
    ) {
        let config = PoolConfig::dynamic(threads, capacity);
        prop_assert!(config.validate().is_err());
    }

    /// Capacity below the thread count never validates
    #[test]
    fn test_config_rejects_undersized_capacity(
        threads in 2usize..16,
        deficit in 1usize..8
    ) {
        let capacity = threads.saturating_sub(deficit);
        let config = PoolConfig::fixed(threads, capacity);
        prop_assert!(config.validate().is_err());
    }
}

// ============================================================================
// JobRing Tests
// ============================================================================

proptest! {
    /// A ring accepts exactly `capacity` descriptors and not one more
    #[test]
    fn test_ring_capacity_invariant(capacity in 1usize..64) {
        let ring = JobRing::new(capacity);

        for seq in 0..capacity {
            prop_assert!(ring.push(JobDescriptor::wakeup(seq)).is_ok());
            prop_assert!(ring.len() <= capacity);
        }
        prop_assert!(matches!(
            ring.push(JobDescriptor::wakeup(capacity)),
            Err(RingError::Full(_))
        ));
        prop_assert_eq!(ring.len(), capacity);
    }

    /// Descriptors come back out in FIFO order regardless of interleaving
    #[test]
    fn test_ring_fifo_order(ops in prop::collection::vec(any::<bool>(), 1..100)) {
        let ring = JobRing::new(16);
        let mut next_push = 0usize;
        let mut next_pop = 0usize;

        for push in ops {
            if push {
                if ring.push(JobDescriptor::wakeup(next_push)).is_ok() {
                    next_push += 1;
                }
            } else if let Some(descriptor) = ring.try_pop() {
                prop_assert_eq!(descriptor.seq(), next_pop);
                next_pop += 1;
                ring.complete();
            }
        }

        while let Some(descriptor) = ring.try_pop() {
            prop_assert_eq!(descriptor.seq(), next_pop);
            next_pop += 1;
            ring.complete();
        }
        prop_assert_eq!(next_pop, next_push);
    }
}

// ============================================================================
// BatchPool Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every job of every batch executes exactly once
    #[test]
    fn test_pool_runs_every_job(
        threads in 2usize..5,
        extra_capacity in 0usize..8,
        jobs in 1usize..40
    ) {
        let capacity = threads + extra_capacity;
        let mut pool = BatchPool::dynamic(threads, capacity).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..jobs {
            let counter = Arc::clone(&counter);
            pool.execute(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }).unwrap();
        }
        pool.wait_for_batch();

        prop_assert_eq!(counter.load(Ordering::SeqCst), jobs);
        prop_assert_eq!(pool.total_jobs_processed(), jobs as u64);
    }

    /// Fixed mode maps slot i to worker i % threads for any valid shape
    #[test]
    fn test_fixed_mapping_holds_for_any_shape(
        threads in 2usize..5,
        extra_capacity in 0usize..8
    ) {
        let capacity = threads + extra_capacity;
        let mut pool = BatchPool::fixed(threads, capacity).unwrap();

        for _ in 0..capacity {
            pool.execute(|_| Ok(())).unwrap();
        }
        pool.wait_for_batch();

        for slot in 0..capacity {
            prop_assert_eq!(pool.job_worker_id(slot).unwrap(), Some(slot % threads));
        }
    }
}
