//! Benchmarks for area-weight mapping construction.
//!
//! Run with: cargo bench --package regrid --bench area_weights

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use regrid::{area_weights, GridMapping, RegularLatLonGrid, WeightBasis};
use test_utils::{axis, regular_grid};

/// A GFAS-like 0.1 degree source covering 30S..40S, 140E..155E.
fn gfas_source() -> RegularLatLonGrid {
    RegularLatLonGrid::from_centres(&axis(-30.05, -0.1, 100), &axis(140.05, 0.1, 150))
        .expect("valid source axes")
}

// =============================================================================
// SINGLE CELL
// =============================================================================

fn bench_single_cell(c: &mut Criterion) {
    let source = gfas_source();
    let mut group = c.benchmark_group("area_weights_single_cell");

    for size in [0.05f64, 0.12, 0.36] {
        let polygon = [
            (145.0, -35.0),
            (145.0 + size, -35.0),
            (145.0 + size, -35.0 + size),
            (145.0, -35.0 + size),
        ];
        group.bench_with_input(BenchmarkId::new("cell_deg", size), &polygon, |b, polygon| {
            b.iter(|| area_weights(black_box(polygon), &source, WeightBasis::SourceArea));
        });
    }

    group.finish();
}

// =============================================================================
// FULL DOMAIN MAPPING
// =============================================================================

fn bench_domain_mapping(c: &mut Criterion) {
    let source = gfas_source();
    let mut group = c.benchmark_group("area_weights_domain");

    for (rows, cols) in [(20usize, 30usize), (60, 80)] {
        let dest = regular_grid(-38.0, 142.0, 6.0 / rows as f64, 10.0 / cols as f64, rows, cols);
        group.throughput(Throughput::Elements((rows * cols) as u64));
        group.bench_with_input(
            BenchmarkId::new("cells", rows * cols),
            &dest,
            |b, dest| {
                b.iter(|| GridMapping::area_weighted(black_box(dest), &source, WeightBasis::SourceArea));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_cell, bench_domain_mapping);
criterion_main!(benches);
