use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;

use lotkeep_core::client::Dealership;
use lotkeep_core::clock::ManualClock;
use lotkeep_core::config::CoordinatorConfig;
use lotkeep_core::types::NewVehicle;

fn stocked(count: usize, clock: Arc<ManualClock>) -> Dealership {
    let dealership = Dealership::with_clock(CoordinatorConfig::default(), clock);
    for i in 0..count {
        dealership
            .add_vehicle(NewVehicle::new(2023, 80_000.0 + i as f64, "Prata", "Hyundai HB20"))
            .unwrap();
    }
    dealership
}

fn bench_reserve_cancel(c: &mut Criterion) {
    let dealership = stocked(1, Arc::new(ManualClock::new(0)));
    c.bench_function("reserve_cancel_cycle", |b| {
        b.iter(|| {
            let reservation = dealership.reserve(1, "client-1").unwrap();
            black_box(dealership.cancel(&reservation.id).unwrap())
        })
    });
}

fn bench_parallel_reserve(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_reserve");

    for threads in [2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                let dealership = stocked(threads * 64, Arc::new(ManualClock::new(0)));
                std::thread::scope(|s| {
                    for t in 0..threads {
                        let d = &dealership;
                        s.spawn(move || {
                            let client = format!("client-{}", t);
                            // Each thread walks its own slice of the lot
                            for i in 0..64 {
                                let id = (t * 64 + i + 1) as u64;
                                black_box(d.reserve(id, &client).unwrap());
                            }
                        });
                    }
                });
            })
        });
    }

    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for count in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("expired", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let clock = Arc::new(ManualClock::new(0));
                    let dealership = stocked(count, clock.clone());
                    for id in 1..=count as u64 {
                        dealership.reserve(id, "client-1").unwrap();
                    }
                    clock.advance(Duration::from_secs(301));
                    dealership
                },
                |dealership| black_box(dealership.sweep_once().unwrap()),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reserve_cancel, bench_parallel_reserve, bench_sweep);
criterion_main!(benches);
