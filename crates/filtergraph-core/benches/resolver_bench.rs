//! # Resolver Benchmarks
//!
//! Narrowing and validation over synthetic catalogs.
//!
//! Run with: `cargo bench -p filtergraph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use filtergraph_core::{
    Dataset, FilterResolver, LocationId, LocationIds, MemoryStore, ModuleId, ModuleIds, UnitId,
    UnitIds,
};
use std::hint::black_box;

/// `size` modules, each offering 4 units; each unit served by 2 locations.
fn create_catalog(size: i64) -> MemoryStore {
    let mut dataset = Dataset::default();
    let units = size * 4;
    let locations = (size / 2).max(1);

    for m in 0..size {
        dataset = dataset.with_module(m, "module");
    }
    for u in 0..units {
        dataset = dataset
            .with_unit(u, "unit")
            .link_module_unit(u % size, u)
            .link_unit_location(u, u % locations)
            .link_unit_location(u, (u + 1) % locations);
    }
    for l in 0..locations {
        dataset = dataset.with_location(l, "location");
    }
    MemoryStore::from_dataset(&dataset).expect("catalog")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_resolve_modules(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_modules");

    for size in [100_i64, 1_000, 10_000] {
        let store = create_catalog(size);
        let units: UnitIds = (0..8).map(UnitId).collect();
        let locations: LocationIds = (0..4).map(LocationId).collect();

        group.bench_with_input(BenchmarkId::new("join", size), &size, |b, _| {
            let resolver = FilterResolver::new(&store);
            b.iter(|| {
                resolver
                    .resolve_modules(black_box(&units), black_box(&locations))
                    .expect("resolve")
            });
        });

        group.bench_with_input(BenchmarkId::new("location_only", size), &size, |b, _| {
            let resolver = FilterResolver::new(&store);
            b.iter(|| {
                resolver
                    .resolve_modules(black_box(&UnitIds::new()), black_box(&locations))
                    .expect("resolve")
            });
        });
    }

    group.finish();
}

fn bench_resolve_locations(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_locations");

    for size in [100_i64, 1_000, 10_000] {
        let store = create_catalog(size);
        let modules: ModuleIds = (0..16).map(ModuleId).collect();
        let units: UnitIds = (0..32).map(UnitId).collect();

        group.bench_with_input(BenchmarkId::new("two_hop", size), &size, |b, _| {
            let resolver = FilterResolver::new(&store);
            b.iter(|| {
                resolver
                    .resolve_locations(black_box(&units), black_box(&modules))
                    .expect("resolve")
            });
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_combination");

    for size in [100_i64, 1_000, 10_000] {
        let store = create_catalog(size);
        let modules: ModuleIds = (0..4).map(ModuleId).collect();
        let units: UnitIds = (0..4).map(UnitId).collect();
        let locations: LocationIds = [LocationId(0), LocationId(1)].into();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let resolver = FilterResolver::new(&store);
            b.iter(|| {
                resolver
                    .validate_combination(
                        black_box(&modules),
                        black_box(&units),
                        black_box(&locations),
                    )
                    .expect("validate")
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_resolve_modules,
    bench_resolve_locations,
    bench_validate
);
criterion_main!(benches);
