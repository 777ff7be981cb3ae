use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use jobring::prelude::*;

fn benchmark_pool_configuration(c: &mut Criterion) {
    c.bench_function("pool_configuration", |b| {
        b.iter(|| {
            let mut pool = BatchPool::dynamic(4, 16).expect("Failed to configure pool");
            pool.shutdown();
        });
    });
}

fn benchmark_batch_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_throughput");

    // Lightweight jobs, shared ring
    group.bench_function("dynamic_lightweight_64", |b| {
        b.iter_batched(
            || BatchPool::dynamic(4, 16).expect("Failed to configure pool"),
            |mut pool| {
                for _ in 0..64 {
                    pool.execute(|_| {
                        black_box(1 + 1);
                        Ok(())
                    })
                    .expect("Failed to submit job");
                }
                pool.wait_for_batch();
                pool
            },
            BatchSize::SmallInput,
        );
    });

    // Lightweight jobs, pinned rings
    group.bench_function("fixed_lightweight_64", |b| {
        b.iter_batched(
            || BatchPool::fixed(4, 16).expect("Failed to configure pool"),
            |mut pool| {
                for _ in 0..64 {
                    pool.execute(|_| {
                        black_box(1 + 1);
                        Ok(())
                    })
                    .expect("Failed to submit job");
                }
                pool.wait_for_batch();
                pool
            },
            BatchSize::SmallInput,
        );
    });

    // Medium workload, shared ring
    group.bench_function("dynamic_medium_64", |b| {
        b.iter_batched(
            || BatchPool::dynamic(4, 16).expect("Failed to configure pool"),
            |mut pool| {
                for _ in 0..64 {
                    pool.execute(|_| {
                        let mut sum = 0u64;
                        for i in 0..1000 {
                            sum = sum.wrapping_add(i);
                        }
                        black_box(sum);
                        Ok(())
                    })
                    .expect("Failed to submit job");
                }
                pool.wait_for_batch();
                pool
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn benchmark_ring_hand_off(c: &mut Criterion) {
    c.bench_function("ring_push_pop_complete", |b| {
        let ring = JobRing::new(64);
        b.iter(|| {
            for seq in 0..64 {
                ring.push(JobDescriptor::wakeup(seq)).expect("push failed");
            }
            while let Some(descriptor) = ring.try_pop() {
                black_box(descriptor.seq());
                ring.complete();
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_pool_configuration,
    benchmark_batch_throughput,
    benchmark_ring_hand_off
);
criterion_main!(benches);
