use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use gastown::prelude::*;

static POPULATION: usize = 1000;
static GRID_SIZE: usize = 100;
static SEED: u64 = 123;
static N_TICKS: usize = 100;
static DT: f64 = 1.0;

fn populated_town() -> Town {
    let parameters = TownParameters {
        population_size: POPULATION,
        grid_size: GRID_SIZE,
        ..TownParameters::default()
    };
    Town::from_parameters(&parameters, RandomSource::new(SEED)).expect("failed to build town")
}

fn run_ticks(mut town: Town) -> Town {
    for _ in 0..N_TICKS {
        town.step(DT).expect("failed to step town");
    }
    town
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("town construction", |bencher| {
        bencher.iter_with_large_drop(populated_town)
    });
    c.bench_function("town 100 ticks", |bencher| {
        bencher.iter_batched(populated_town, run_ticks, BatchSize::LargeInput)
    });
    let town = populated_town();
    c.bench_function("town statistics", |bencher| bencher.iter(|| town.statistics()));
}

criterion_group!(town_benches, criterion_benchmark);
criterion_main!(town_benches);
