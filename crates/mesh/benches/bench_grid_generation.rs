use std::hint::black_box;
use std::time::Instant;

use bigplane_mesh::{FillStrategy, GridConfig, generate_plane};

fn bench_generate(grid_size: u32, fill: FillStrategy, iterations: usize) {
    let config = GridConfig {
        fill,
        ..GridConfig::with_size(grid_size)
    };
    let triangles = config.expected_stats().triangles;

    let start = Instant::now();
    for _ in 0..iterations {
        let mesh = generate_plane(black_box(&config)).expect("generate plane");
        black_box(mesh.index_count());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    let tris_per_sec = triangles as f64 / per_iter.as_secs_f64();
    println!(
        "  {fill:?} N={grid_size} ({triangles} triangles, {iterations} iters): {per_iter:?}/iter, {:.1}M tris/s",
        tris_per_sec / 1e6
    );
}

fn bench_zero_filled_baseline(grid_size: u32, iterations: usize) {
    let n = grid_size as usize;
    let start = Instant::now();
    for _ in 0..iterations {
        let vertices = vec![0.0f32; n * n * 3];
        let indices = vec![0u32; (n - 1) * (n - 1) * 6];
        black_box((vertices.len(), indices.len()));
    }
    let per_iter = start.elapsed() / iterations as u32;
    println!("  zero-filled allocation only N={grid_size}: {per_iter:?}/iter");
}

fn main() {
    println!("=== Grid Generation Benchmarks ===\n");

    println!("Serial fill:");
    bench_generate(256, FillStrategy::Serial, 100);
    bench_generate(1024, FillStrategy::Serial, 10);
    bench_generate(4000, FillStrategy::Serial, 2);

    println!("\nParallel fill:");
    bench_generate(256, FillStrategy::Parallel, 100);
    bench_generate(1024, FillStrategy::Parallel, 10);
    bench_generate(4000, FillStrategy::Parallel, 2);

    println!("\nBaseline:");
    bench_zero_filled_baseline(1024, 10);
    bench_zero_filled_baseline(4000, 2);

    println!("\n=== Done ===");
}
