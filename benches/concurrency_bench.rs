// Concurrency engine performance benchmarks.
// Exercises transaction lifecycle and lock acquisition under contention across the
// three engines this crate implements.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use concurrency_core::transaction::{
    deadlock::DeadlockHandler, lock_manager::LockManager, types::DeadlockPolicy, Action,
    ConcurrencyEngine, LockBasedEngine, TimestampBasedEngine, ValidationBasedEngine,
};

fn bench_begin_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("begin_commit");

    group.bench_function("lock_based", |b| {
        let engine = LockBasedEngine::new();
        b.iter(|| {
            let tid = engine.begin();
            engine.commit(tid).ok();
            engine.commit_flushed(tid).ok();
            black_box(tid);
        });
    });

    group.bench_function("timestamp_based", |b| {
        let engine = TimestampBasedEngine::new();
        b.iter(|| {
            let tid = engine.begin();
            engine.commit(tid).ok();
            engine.commit_flushed(tid).ok();
            black_box(tid);
        });
    });

    group.bench_function("validation_based", |b| {
        let engine = ValidationBasedEngine::new();
        b.iter(|| {
            let tid = engine.begin();
            engine.commit(tid).ok();
            engine.commit_flushed(tid).ok();
            black_box(tid);
        });
    });

    group.finish();
}

fn bench_lock_acquisition(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_acquisition");

    group.bench_function("uncontended_exclusive", |b| {
        let lm = LockManager::new();
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            black_box(lm.try_acquire(id, Action::Write, "X"));
        });
    });

    group.bench_function("shared_with_many_readers", |b| {
        let lm = LockManager::new();
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            black_box(lm.try_acquire(id, Action::Read, "X"));
        });
    });

    group.finish();
}

fn bench_deadlock_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("deadlock_resolution");

    for policy in [DeadlockPolicy::WaitDie, DeadlockPolicy::CycleDetection] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{policy:?}")),
            &policy,
            |b, &policy| {
                b.iter(|| {
                    let handler = DeadlockHandler::new(policy);
                    black_box(handler.resolve(1, 1, &[(2, 2)]));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_begin_commit,
    bench_lock_acquisition,
    bench_deadlock_policies
);
criterion_main!(benches);
