//! Benchmarks for the overlap engine on synthetic atlases

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use difumo_core::{overlaps, RegionMap};
use std::hint::black_box;

/// Probabilistic maps: each region is a smooth bump over a window of voxels
fn generate_maps(n_regions: usize, n_voxels: usize) -> RegionMap {
    let width = (n_voxels / n_regions).max(1) * 4;
    let mut map = RegionMap::empty(n_voxels);
    for region in 0..n_regions {
        let start = region * n_voxels / n_regions;
        let entries = (0..width).map(|offset| {
            let voxel = (start + offset) % n_voxels;
            let x = offset as f64 / width as f64;
            (voxel, (x * std::f64::consts::PI).sin())
        });
        map.push_sparse_row(entries).unwrap();
    }
    map
}

/// Binary parcellation: each voxel belongs to exactly one region
fn generate_parcellation(n_regions: usize, n_voxels: usize) -> RegionMap {
    let mut map = RegionMap::empty(n_voxels);
    for region in 0..n_regions {
        let entries = (0..n_voxels)
            .filter(|voxel| voxel % n_regions == region)
            .map(|voxel| (voxel, 1.0));
        map.push_sparse_row(entries).unwrap();
    }
    map
}

fn bench_against_parcellation(c: &mut Criterion) {
    let mut group = c.benchmark_group("difumo_vs_parcellation");
    let n_voxels = 200_000;
    let targets = generate_parcellation(96, n_voxels);

    for dimension in [64, 128, 256, 512] {
        let queries = generate_maps(dimension, n_voxels);
        group.throughput(Throughput::Elements(queries.nnz() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            &queries,
            |b, queries| {
                b.iter(|| overlaps(black_box(queries), Some(black_box(&targets))));
            },
        );
    }

    group.finish();
}

fn bench_self_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("self_overlap");
    let n_voxels = 200_000;

    for dimension in [64, 256] {
        let queries = generate_maps(dimension, n_voxels);
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            &queries,
            |b, queries| {
                b.iter(|| overlaps(black_box(queries), None));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_against_parcellation, bench_self_overlap);
criterion_main!(benches);
