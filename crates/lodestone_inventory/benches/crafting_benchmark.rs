//! Benchmark for crafting and inventory hot paths.
//!
//! Run with: cargo bench --package lodestone_inventory --bench crafting_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lodestone_catalog::Catalog;
use lodestone_inventory::{craft, Inventory};

fn catalog() -> Catalog {
    Catalog::load_defaults().expect("embedded catalog")
}

fn stocked_inventory(catalog: &Catalog, recipe_name: &str) -> Inventory {
    let recipe = catalog.assembler_recipe(recipe_name).expect("known recipe");
    let mut inventory = Inventory::new();
    for (item, &count) in &recipe.ingredients {
        inventory.add(item, count * 100);
    }
    inventory
}

fn benchmark_craft_transaction(c: &mut Criterion) {
    let catalog = catalog();
    c.bench_function("craft_with_rollback_potential", |b| {
        b.iter_batched(
            || stocked_inventory(&catalog, "gear"),
            |mut inventory| black_box(craft(&mut inventory, &catalog, "gear")),
            criterion::BatchSize::SmallInput,
        );
    });
}

fn benchmark_snapshot_restore(c: &mut Criterion) {
    let mut inventory = Inventory::new();
    inventory.add("iron_ore", 50);

    c.bench_function("inventory_snapshot_restore", |b| {
        b.iter(|| {
            let snapshot = inventory.snapshot();
            inventory.remove("iron_ore", 10);
            inventory.restore(black_box(&snapshot));
        });
    });
}

fn benchmark_add_fill_then_overflow(c: &mut Criterion) {
    c.bench_function("inventory_add_to_capacity", |b| {
        b.iter(|| {
            let mut inventory = Inventory::new();
            black_box(inventory.add("iron_ore", 4_000))
        });
    });
}

fn benchmark_sort(c: &mut Criterion) {
    let catalog = catalog();
    c.bench_function("inventory_sort_full", |b| {
        b.iter_batched(
            || {
                let mut inventory = Inventory::new();
                for item in ["iron_ore", "coal", "iron_plate", "copper_ore", "copper_plate", "gear"] {
                    inventory.add(item, 50);
                }
                inventory
            },
            |mut inventory| inventory.sort(black_box(&catalog)),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    benchmark_craft_transaction,
    benchmark_snapshot_restore,
    benchmark_add_fill_then_overflow,
    benchmark_sort
);
criterion_main!(benches);
