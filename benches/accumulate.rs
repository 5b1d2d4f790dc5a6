//! Accumulation throughput over synthetic slices
//!
//! Run with: cargo bench --bench accumulate

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use svx2vdb::accumulate::{accumulate, depth_index};
use svx2vdb::{FloatGrid, SliceBuffer};

fn disc_slice(size: usize) -> SliceBuffer {
    let r = (size / 2) as i64;
    SliceBuffer::from_fn(size, size, |(x, y)| {
        let dx = x as i64 - r;
        let dy = y as i64 - r;
        if dx * dx + dy * dy <= r * r {
            255
        } else {
            0
        }
    })
}

fn bench_accumulate(c: &mut Criterion) {
    let slice = disc_slice(256);

    c.bench_function("accumulate_256x256_disc", |b| {
        b.iter(|| {
            let mut grid = FloatGrid::new(2.0);
            accumulate(&mut grid, black_box(&slice), 0)
        })
    });

    c.bench_function("accumulate_stack_16", |b| {
        b.iter(|| {
            let mut grid = FloatGrid::new(2.0);
            for z in 0..16 {
                accumulate(&mut grid, black_box(&slice), depth_index(z, 16));
            }
            grid.active_voxel_count()
        })
    });
}

criterion_group!(benches, bench_accumulate);
criterion_main!(benches);
