//! Simulation benchmarks for tactics_core.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tactics_core::pathfinding::plan;
use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{enemy, friendly, simulation_with, standard_grid, standard_opening};

/// Corner-to-corner planning on the standard map.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let grid = standard_grid();
    let rules = Rules::default();
    let sim = standard_opening();
    let Some(unit) = sim.units().by_name("XA").cloned() else {
        return;
    };

    c.bench_function("plan_corner_to_base", |b| {
        b.iter(|| plan(black_box(&grid), &rules, sim.units(), black_box(&unit)));
    });
}

/// Full ticks with a crowded board.
pub fn tick_benchmark(c: &mut Criterion) {
    let crowded = || {
        simulation_with(
            standard_grid(),
            [
                friendly("AB", 1, 0),
                friendly("AC", 0, 1),
                friendly("AD", 3, 2),
                enemy("XA", 11, 11, Coord::new(0, 0)),
                enemy("XB", 10, 11, Coord::new(0, 0)),
                enemy("XC", 11, 8, Coord::new(0, 0)),
                enemy("XD", 8, 11, Coord::new(0, 0)),
            ],
        )
    };

    c.bench_function("tick_seven_units", |b| {
        b.iter_batched(
            || (crowded(), SeededRoll::new(1)),
            |(mut sim, mut roll)| {
                for _ in 0..10 {
                    black_box(sim.tick(&mut roll));
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, pathfinding_benchmark, tick_benchmark);
criterion_main!(benches);
