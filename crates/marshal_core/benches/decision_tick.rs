//! Decision-tick benchmarks for marshal_core.
//!
//! Run with: `cargo bench -p marshal_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use marshal_test_utils::fake_engine::{FakeEngine, FakeUnit};
use marshal_test_utils::fixtures::{
    demo_bot, COMMAND_POST, CRUSHER, ENEMY_RAIDER, EXTRACTOR, FABRICATOR, MUSTER_YARD, TROOPER,
};

use marshal_core::ledger::Resources;

/// A mid-game world: full economy, standing army, visible raiders.
fn mid_game_world() -> FakeEngine {
    let mut engine = FakeEngine::new();
    engine.set_extractor_type(EXTRACTOR);
    engine.spawn(FakeUnit::structure(COMMAND_POST).at(5, 5));
    engine.spawn(FakeUnit::structure(MUSTER_YARD).at(8, 5));
    engine.spawn(FakeUnit::structure(MUSTER_YARD).at(8, 7));
    engine.spawn(FakeUnit::structure(EXTRACTOR).at(3, 8));
    engine.spawn_mineral_node(5, 2);
    engine.spawn_geyser(3, 9);
    for i in 0..20 {
        engine.spawn(FakeUnit::unit(FABRICATOR).at(4 + i % 5, 3 + i / 5));
    }
    for i in 0..12 {
        engine.spawn(FakeUnit::unit(TROOPER).at(12 + i % 4, 8 + i / 4));
    }
    for i in 0..4 {
        engine.spawn(FakeUnit::unit(CRUSHER).at(12 + i, 12));
    }
    for i in 0..6 {
        engine.spawn(FakeUnit::unit(ENEMY_RAIDER).at(40 + i, 40).hostile());
    }
    engine.set_resources(Resources::new(800, 200));
    engine
}

/// Full pipeline cost of one decision tick on a mid-game world.
pub fn decision_tick_benchmark(c: &mut Criterion) {
    let world = mid_game_world();
    c.bench_function("decision_tick_midgame", |b| {
        b.iter_batched(
            || (demo_bot(), world.clone()),
            |(mut bot, mut engine)| {
                let ledger = engine.ledger();
                engine.set_now(8);
                bot.on_frame(&mut engine, &ledger);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, decision_tick_benchmark);
criterion_main!(benches);
