//! Benchmarks for the transition chain and the state store.
//!
//! Run with:
//! ```bash
//! cargo bench --bench chain
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ltmc_rs::chain::TransitionChain;
use ltmc_rs::model::IndexedTransition;
use ltmc_rs::store::StateStore;
use ltmc_rs::types::LabelSet;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Generate deterministic random distributions, one per source.
fn random_distributions(seed: u64, sources: usize, degree: usize, targets: usize) -> Vec<Vec<IndexedTransition>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..sources)
        .map(|_| {
            (0..degree)
                .map(|_| IndexedTransition {
                    target: rng.random_range(0..targets),
                    labels: LabelSet::from_bits(rng.random_range(0..4)),
                    probability: Some(1.0 / degree as f64),
                })
                .collect()
        })
        .collect()
}

/// Generate deterministic random states of the given size.
fn random_states(seed: u64, count: usize, size: usize) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..size).map(|_| rng.random()).collect())
        .collect()
}

// ============================================================================
// Benchmark: Adding distributions
// ============================================================================

fn bench_add_state_info(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/add_state_info");

    let sources = 1 << 12;
    for degree in [1, 4, 16, 64] {
        // Few targets per source, so many transitions get merged
        let distributions = random_distributions(42, sources, degree, 8);

        group.throughput(Throughput::Elements((sources * degree) as u64));
        group.bench_with_input(BenchmarkId::new("merging", degree), &distributions, |b, distributions| {
            b.iter_with_setup(
                || TransitionChain::new(sources, sources * degree),
                |chain| {
                    for (source, transitions) in distributions.iter().enumerate() {
                        chain.add_state_info(source, false, transitions).unwrap();
                    }
                    chain
                },
            );
        });
    }

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let sources = 1 << 12;
    let distributions = random_distributions(7, sources, 16, sources);
    let chain = TransitionChain::new(sources, sources * 16);
    for (source, transitions) in distributions.iter().enumerate() {
        chain.add_state_info(source, false, transitions).unwrap();
    }

    c.bench_function("chain/iterate", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for source in chain.source_states() {
                sum += chain.transitions(source).map(|e| e.probability).sum::<f64>();
            }
            sum
        });
    });
}

// ============================================================================
// Benchmark: State store
// ============================================================================

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/add_state");

    for size in [4, 16, 64] {
        let states = random_states(123, 1 << 14, size);

        group.throughput(Throughput::Elements(states.len() as u64));
        group.bench_with_input(BenchmarkId::new("fresh", size), &states, |b, states| {
            b.iter_with_setup(
                || StateStore::new(states.len(), size),
                |store| {
                    for state in states {
                        store.add_state(state).unwrap();
                    }
                    store
                },
            );
        });
        group.bench_with_input(BenchmarkId::new("duplicate", size), &states, |b, states| {
            let store = StateStore::new(states.len(), size);
            for state in states {
                store.add_state(state).unwrap();
            }
            b.iter(|| {
                for state in states {
                    store.add_state(state).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add_state_info, bench_iterate, bench_store);
criterion_main!(benches);
