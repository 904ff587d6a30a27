use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::{effect, observable, signal};

fn untracked_reads(c: &mut Criterion) {
    let cell = signal(1_u64);
    c.bench_function("signal_get_untracked_context", |b| {
        b.iter(|| black_box(cell.get()))
    });
}

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_set_fan_out");
    for subscribers in [1_usize, 16, 256] {
        let cell = signal(0_u64);
        let sink = Arc::new(AtomicU64::new(0));
        let _effects: Vec<_> = (0..subscribers)
            .map(|_| {
                let (cell_in, sink_in) = (cell.clone(), sink.clone());
                effect(move || {
                    sink_in.fetch_add(cell_in.get(), Ordering::Relaxed);
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                let mut next = 0_u64;
                b.iter(|| {
                    next += 1;
                    cell.set(next).ok();
                })
            },
        );
    }
    group.finish();
}

fn map_fields(c: &mut Criterion) {
    let map = observable((0..64).map(|i| (format!("k{i}"), i as u64)));
    let reader = map.clone();
    let _effect = effect(move || {
        for i in 0..64 {
            reader.get(&format!("k{i}"));
        }
    });

    c.bench_function("observable_set_one_of_64", |b| {
        let mut next = 100_u64;
        b.iter(|| {
            next += 1;
            map.set("k7", next).ok();
        })
    });
}

criterion_group!(benches, untracked_reads, fan_out, map_fields);
criterion_main!(benches);
