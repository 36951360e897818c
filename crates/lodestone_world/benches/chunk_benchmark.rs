//! Benchmark for chunk generation and storage performance.
//!
//! Run with: cargo bench --package lodestone_world --bench chunk_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lodestone_catalog::Catalog;
use lodestone_world::noise::WorldSeed;
use lodestone_world::store::{ChunkStore, NullBackingStore};
use lodestone_world::{BiomeClassifier, BiomeThresholds};

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::load_defaults().expect("embedded catalog"))
}

fn benchmark_single_chunk_generation(c: &mut Criterion) {
    let mut store = ChunkStore::new(WorldSeed::new(42), catalog(), Box::new(NullBackingStore));

    c.bench_function("single_chunk_generation", |b| {
        let mut n = 0i64;
        b.iter(|| {
            n += 32;
            black_box(store.tile_at(black_box(n), black_box(n / 2)));
        });
    });
}

fn benchmark_chunk_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_grid");
    group.throughput(Throughput::Elements(32 * 32));
    group.bench_function("32x32_chunks", |b| {
        b.iter(|| {
            let mut store = ChunkStore::new(WorldSeed::new(42), catalog(), Box::new(NullBackingStore));
            for cy in 0..32i64 {
                for cx in 0..32i64 {
                    black_box(store.tile_at(cx * 32, cy * 32));
                }
            }
        });
    });
    group.finish();
}

fn benchmark_biome_classification(c: &mut Criterion) {
    let classifier = BiomeClassifier::new(WorldSeed::new(42), BiomeThresholds::default());

    c.bench_function("biome_classification_per_tile", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 1.0;
            black_box(classifier.classify_at(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_chunk_compression(c: &mut Criterion) {
    let mut store = ChunkStore::new(WorldSeed::new(42), catalog(), Box::new(NullBackingStore));
    let chunk = store.ensure_chunk(lodestone_world::ChunkCoord::new(0, 0)).clone();

    c.bench_function("chunk_compression_round_trip", |b| {
        b.iter(|| {
            let bytes = chunk.to_compressed_bytes();
            black_box(lodestone_world::Chunk::from_compressed_bytes(chunk.coord, &bytes).unwrap());
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_single_chunk_generation,
              benchmark_chunk_grid,
              benchmark_biome_classification,
              benchmark_chunk_compression
}

criterion_main!(benches);
