//! Benchmarks for admission planning.
//!
//! Benchmarks cover:
//! - First-fit planning over long waiting queues
//! - Re-planning after a single completion frees units

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use shell_pool::core::{plan, JobRecord, JobSpec, ResourceLedger};

// ============================================================================
// Helpers
// ============================================================================

fn random_queue(len: usize, max_cpus: u32, seed: u64) -> Vec<JobRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|i| {
            let cpus = rng.random_range(1..=max_cpus);
            let spec = JobSpec::new(format!("job {i}"))
                .with_cpus(cpus)
                .with_prefix(format!("j{i}"));
            JobRecord::new(i as u64 + 1, spec)
        })
        .collect()
}

// ============================================================================
// Planner Benchmarks
// ============================================================================

fn bench_plan_from_empty(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_from_empty");

    for len in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let queue = random_queue(len, 8, 42);
            b.iter_batched(
                || (queue.clone(), ResourceLedger::new(64)),
                |(mut waiting, mut ledger)| {
                    let admitted = plan(&mut waiting, &mut ledger);
                    black_box((admitted, waiting))
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_replan_after_completion(c: &mut Criterion) {
    let mut group = c.benchmark_group("replan_after_completion");

    for len in [1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let mut waiting = random_queue(len, 8, 7);
            let mut ledger = ResourceLedger::new(16);
            let running = plan(&mut waiting, &mut ledger);
            let freed = running.first().map_or(1, JobRecord::units);

            b.iter_batched(
                || {
                    let mut ledger = ledger.clone();
                    ledger.release(freed);
                    (waiting.clone(), ledger)
                },
                |(mut waiting, mut ledger)| black_box(plan(&mut waiting, &mut ledger)),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(planner_benches, bench_plan_from_empty, bench_replan_after_completion);

criterion_main!(planner_benches);
