use std::path::PathBuf;
use std::time::{Duration, Instant};

use bigplane_mesh::{FillStrategy, GridConfig, MeshStats, export_obj, generate_plane};
use bigplane_render::{RecordingBackend, RecordingWindow, RenderLoop};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bigplane-cli", about = "CLI tool for bigplane mesh generation")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct GridArgs {
    /// Vertices per side of the grid
    #[arg(short = 'n', long, default_value = "1024")]
    grid_size: u32,
    /// Inset of the plane from the NDC edge
    #[arg(long, default_value = "0.1")]
    margin: f32,
    /// Constant z of the plane
    #[arg(long, default_value = "0.0")]
    depth: f32,
    /// Generate on one thread instead of the rayon pool
    #[arg(long)]
    serial: bool,
    /// Refuse to generate buffers larger than this many MiB
    #[arg(long)]
    memory_budget_mib: Option<u64>,
}

impl GridArgs {
    fn config(&self) -> GridConfig {
        GridConfig {
            grid_size: self.grid_size,
            margin: self.margin,
            depth: self.depth,
            fill: if self.serial {
                FillStrategy::Serial
            } else {
                FillStrategy::Parallel
            },
            memory_budget: self
                .memory_budget_mib
                .map(|mib| mib.saturating_mul(1024 * 1024)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Generate a plane and report its size and generation time
    Generate {
        #[command(flatten)]
        grid: GridArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a plane and write it as a Wavefront OBJ file
    Export {
        /// Output path
        path: PathBuf,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Run the render loop headless against a recording backend
    Simulate {
        #[command(flatten)]
        grid: GridArgs,
        /// Number of frames to run
        #[arg(short, long, default_value = "300")]
        frames: u64,
        /// Simulated frame rate
        #[arg(long, default_value = "60")]
        fps: u32,
    },
}

#[derive(Serialize)]
struct GenerateReport {
    grid: GridConfig,
    stats: MeshStats,
    elapsed_ms: f64,
    million_triangles_per_second: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("bigplane-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("mesh: {}", bigplane_mesh::crate_info());
            println!("render: {}", bigplane_render::crate_info());
            let stats = GridConfig::default().expected_stats();
            println!(
                "default grid: N={} triangles={} bytes={}",
                GridConfig::default().grid_size,
                stats.triangles,
                stats.total_bytes()
            );
        }
        Commands::Generate { grid, json } => {
            let config = grid.config();
            config.validate()?;

            let start = Instant::now();
            let mesh = generate_plane(&config)?;
            let elapsed = start.elapsed();

            let stats = mesh.stats();
            let report = GenerateReport {
                grid: config,
                stats,
                elapsed_ms: elapsed.as_secs_f64() * 1e3,
                million_triangles_per_second: stats.triangles as f64
                    / elapsed.as_secs_f64().max(f64::EPSILON)
                    / 1e6,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Generated N={} plane in {elapsed:?}", config.grid_size);
                println!(
                    "vertices={} indices={} triangles={}",
                    stats.vertices, stats.indices, stats.triangles
                );
                println!(
                    "vertex bytes={} index bytes={} ({:.1}M tris/s)",
                    stats.vertex_bytes, stats.index_bytes, report.million_triangles_per_second
                );
            }
        }
        Commands::Export { path, grid } => {
            let config = grid.config();
            config.validate()?;
            let mesh = generate_plane(&config)?;
            export_obj(&path, &mesh)?;
            println!(
                "Successfully saved {} triangles to {}",
                mesh.triangle_count(),
                path.display()
            );
        }
        Commands::Simulate { grid, frames, fps } => {
            let config = grid.config();
            config.validate()?;
            anyhow::ensure!(fps > 0, "fps must be positive");
            let mesh = generate_plane(&config)?;

            let t0 = Instant::now();
            let mut render_loop = RenderLoop::new(RecordingBackend::counting(), &mesh, t0)?;
            let mut window = RecordingWindow::closing_after(frames);

            let frame_time = Duration::from_secs(1) / fps;
            let mut now = t0;
            let summary = render_loop.run_with_clock(&mut window, || {
                now += frame_time;
                now
            });

            for title in window.titles() {
                println!("{title}");
            }
            println!(
                "Simulated {} frames over {:?}: average {:.1} FPS, final angle {:.2} deg",
                summary.frames,
                summary.elapsed,
                summary.average_fps(),
                summary.angle_degrees
            );
            println!(
                "Backend presented {} frames of {} indices",
                render_loop.backend().frames_presented(),
                render_loop.index_count()
            );
        }
    }

    Ok(())
}
