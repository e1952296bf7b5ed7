//! Benchmarks for the depth first search stack and work splitting.
//!
//! Run with:
//! ```bash
//! cargo bench --bench stack
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ltmc_rs::stack::DfsStack;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Generate deterministic random frame sizes with the given maximum fan-out.
fn random_frame_sizes(seed: u64, frames: usize, max_fan_out: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..frames).map(|_| rng.random_range(1..=max_fan_out)).collect()
}

fn fill(stack: &mut DfsStack, sizes: &[usize]) {
    let mut state = 0;
    for &size in sizes {
        stack.push_frame().unwrap();
        for _ in 0..size {
            stack.push_state(state).unwrap();
            state += 1;
        }
    }
}

// ============================================================================
// Benchmark: Push and drain
// ============================================================================

fn bench_push_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack/push_drain");

    for fan_out in [1, 4, 16] {
        let sizes = random_frame_sizes(42, 1 << 10, fan_out);
        let total: usize = sizes.iter().sum();

        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(BenchmarkId::new("fan_out", fan_out), &sizes, |b, sizes| {
            b.iter_with_setup(
                || DfsStack::new(1 << 16),
                |mut stack| {
                    fill(&mut stack, sizes);
                    // Expand every state into an empty frame, which drops it again
                    let mut expanded = 0;
                    while stack.try_get_state().is_some() {
                        stack.push_frame().unwrap();
                        expanded += 1;
                    }
                    expanded
                },
            );
        });
    }

    group.finish();
}

fn bench_get_path(c: &mut Criterion) {
    let sizes = random_frame_sizes(7, 1 << 12, 4);
    let mut stack = DfsStack::new(1 << 16);
    fill(&mut stack, &sizes);

    c.bench_function("stack/get_path", |b| b.iter(|| stack.get_path()));
}

// ============================================================================
// Benchmark: Work splitting
// ============================================================================

fn bench_split_work(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack/split_work");

    for depth in [16, 256, 4096] {
        // Single-state frames up to the last one, so the whole prefix is mirrored
        let mut sizes = vec![1; depth - 1];
        sizes.push(8);

        group.bench_with_input(BenchmarkId::new("depth", depth), &sizes, |b, sizes| {
            b.iter_with_setup(
                || {
                    let mut stack = DfsStack::new(1 << 16);
                    fill(&mut stack, sizes);
                    (stack, DfsStack::new(1 << 16))
                },
                |(mut stack, mut other)| {
                    assert!(stack.split_work(&mut other));
                    (stack, other)
                },
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_push_drain, bench_get_path, bench_split_work);
criterion_main!(benches);
