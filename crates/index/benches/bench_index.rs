use std::hint::black_box;
use std::time::Instant;

use glam::DVec3;
use gridspace_index::{Cylinder, Handle, SpatialIndex, Sphere};

fn grid_position(i: usize, side: usize, spacing: f64) -> DVec3 {
    DVec3::new((i % side) as f64 * spacing, 0.0, (i / side) as f64 * spacing)
}

fn make_index(entity_count: usize, spacing: f64) -> (SpatialIndex<usize>, Vec<Handle<usize>>) {
    let index = SpatialIndex::with_tile_size(16.0).unwrap();
    let side = (entity_count as f64).sqrt().ceil() as usize;
    let handles = (0..entity_count)
        .map(|i| index.create(i, grid_position(i, side, spacing)))
        .collect();
    (index, handles)
}

fn bench_create(entity_count: usize) {
    let start = Instant::now();
    let (index, _handles) = make_index(entity_count, 4.0);
    let elapsed = start.elapsed();
    println!(
        "  create ({entity_count} entities, {} partitions): {:?}/entity, total {elapsed:?}",
        index.partition_count(),
        elapsed.div_f64(entity_count as f64)
    );
}

fn bench_update(entity_count: usize, iterations: usize, step: f64) {
    let (index, handles) = make_index(entity_count, 4.0);
    let side = (entity_count as f64).sqrt().ceil() as usize;

    let start = Instant::now();
    for it in 0..iterations {
        let offset = if it % 2 == 0 { step } else { 0.0 };
        for (i, handle) in handles.iter().enumerate() {
            let pos = grid_position(i, side, 4.0) + DVec3::new(offset, 0.0, 0.0);
            index.update(black_box(handle), black_box(pos));
        }
    }
    let elapsed = start.elapsed();
    let per_update = elapsed.div_f64((iterations * entity_count) as f64);
    println!(
        "  update ({entity_count} entities, step={step}, {iterations} iters): {per_update:?}/update, total {elapsed:?}"
    );
}

fn bench_sphere_query(entity_count: usize, radius: f64, iterations: usize) {
    let (index, _handles) = make_index(entity_count, 4.0);
    let sphere = Sphere::new(DVec3::new(32.0, 0.0, 32.0), radius);

    let mut buffer = Vec::new();
    let mut found = 0;
    let start = Instant::now();
    for _ in 0..iterations {
        buffer.clear();
        buffer = index.query(black_box(&sphere), buffer);
        found = buffer.len();
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed.div_f64(iterations as f64);
    println!(
        "  sphere query ({entity_count} entities, r={radius}, {found} hits, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_cylinder_query(entity_count: usize, radius: f64, iterations: usize) {
    let (index, _handles) = make_index(entity_count, 4.0);
    let cylinder = Cylinder::new(DVec3::new(32.0, 0.0, 32.0), radius, 10.0, -10.0);

    let mut buffer = Vec::new();
    let start = Instant::now();
    for _ in 0..iterations {
        buffer.clear();
        buffer = index.query(black_box(&cylinder), buffer);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed.div_f64(iterations as f64);
    println!(
        "  cylinder query ({entity_count} entities, r={radius}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Spatial Index Benchmarks ===\n");

    println!("Create:");
    bench_create(100);
    bench_create(1000);
    bench_create(10000);

    println!("\nUpdate (same cell vs. crossing cells):");
    bench_update(1000, 10, 1.0);
    bench_update(1000, 10, 16.0);

    println!("\nSphere query:");
    bench_sphere_query(1000, 8.0, 10000);
    bench_sphere_query(1000, 32.0, 10000);
    bench_sphere_query(10000, 64.0, 1000);

    println!("\nCylinder query:");
    bench_cylinder_query(1000, 32.0, 10000);

    println!("\n=== Done ===");
}
