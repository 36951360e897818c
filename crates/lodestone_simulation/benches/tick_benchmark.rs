//! Benchmark for one simulation tick across a populated production chain.
//!
//! Run with: cargo bench --package lodestone_simulation --bench tick_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lodestone_catalog::Catalog;
use lodestone_shared::Direction;
use lodestone_simulation::Simulation;
use lodestone_world::{ChunkStore, NullBackingStore, WorldSeed};

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::load_defaults().expect("embedded catalog"))
}

/// Builds `chains` independent MINER -> CONVEYOR -> CHEST lines, laid out
/// one row apart so none of their downstream tiles collide.
fn populated_simulation(chains: i64) -> Simulation {
    let catalog = catalog();
    let world = ChunkStore::new(WorldSeed::new(42), catalog.clone(), Box::new(NullBackingStore));
    let mut sim = Simulation::new(world, catalog, 1, 0);

    for row in 0..chains {
        sim.build("miner", 0, row, Direction::East).expect("grass-ish terrain is usually placeable");
        sim.build("conveyor", 1, row, Direction::East);
        sim.build("chest", 2, row, Direction::East);
    }
    sim
}

fn benchmark_single_tick_one_chain(c: &mut Criterion) {
    let mut sim = populated_simulation(1);
    c.bench_function("single_tick_one_chain", |b| {
        b.iter(|| black_box(sim.tick(&[])));
    });
}

fn benchmark_tick_many_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_many_chains");
    for &chains in &[10i64, 100, 500] {
        let mut sim = populated_simulation(chains);
        group.throughput(Throughput::Elements(chains as u64 * 3));
        group.bench_function(format!("{chains}_chains"), |b| {
            b.iter(|| black_box(sim.tick(&[])));
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_single_tick_one_chain, benchmark_tick_many_chains
}

criterion_main!(benches);
