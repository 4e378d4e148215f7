use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use glam::Vec3;
use tracing_subscriber::EnvFilter;
use tumble_common::Shape;
use tumble_engine::SimWorld;
use tumble_protocol::DEFAULT_CAPACITY;
use tumble_sync::{Action, Synchronizer, TextScene};
use tumble_worker::{PhysicsWorker, WorkerConfig};

#[derive(Parser)]
#[command(name = "tumble-cli", about = "Headless sandbox sessions")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default configuration
    Info,
    /// Run a timed headless session against a live physics worker
    Run {
        /// Spheres to spawn at start
        #[arg(long, default_value = "3")]
        spheres: u32,
        /// Boxes to spawn at start
        #[arg(long, default_value = "3")]
        boxes: u32,
        /// Wall-clock session length in seconds
        #[arg(long, default_value = "2.0")]
        seconds: f32,
        /// Spawn-parameter RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
    /// Step a single sphere in-process until it comes to rest
    Settle {
        /// Drop height in meters
        #[arg(long, default_value = "3.0")]
        height: f32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let config = WorkerConfig::default();
            println!("tumble-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("buffer capacity: {DEFAULT_CAPACITY} bodies");
            println!(
                "worker: period={:?}, max_substeps={}, gravity=({}, {}, {})",
                config.period,
                config.max_substeps,
                config.gravity.x,
                config.gravity.y,
                config.gravity.z
            );
        }
        Commands::Run {
            spheres,
            boxes,
            seconds,
            seed,
        } => {
            println!("Session: {spheres} spheres, {boxes} boxes, {seconds}s, seed={seed}");

            let (worker, commands, frames) = PhysicsWorker::spawn(WorkerConfig::default())?;
            let mut sync = Synchronizer::new(commands, frames, DEFAULT_CAPACITY, seed);
            let mut scene = TextScene::new();

            for _ in 0..spheres {
                sync.apply(Action::SpawnSphere, &mut scene);
            }
            for _ in 0..boxes {
                sync.apply(Action::SpawnBox, &mut scene);
            }

            let deadline = Instant::now() + Duration::from_secs_f32(seconds);
            let mut frames_applied = 0u64;
            while Instant::now() < deadline {
                let was_pending = sync.pending();
                sync.sync(&mut scene);
                if was_pending && !sync.pending() {
                    frames_applied += 1;
                }
                thread::sleep(Duration::from_millis(16));
            }

            print!("{}", scene.summary());
            println!("Frames applied: {frames_applied}");

            drop(sync);
            worker.join();
        }
        Commands::Settle { height } => {
            const DT: f32 = 1.0 / 60.0;
            const REST_SPEED: f32 = 1e-3;

            let radius = 0.1;
            let mut sim = SimWorld::new(Vec3::new(0.0, -9.81, 0.0));
            let index = sim.add_body(Shape::sphere(radius), Vec3::new(0.0, height, 0.0));

            let mut prev_y = height;
            let mut settled_at = None;
            for step in 1..=600u32 {
                sim.step(DT, DT, 1);
                let y = sim
                    .body_pose(index)
                    .map(|p| p.position.y)
                    .unwrap_or(prev_y);
                if (y - prev_y).abs() < REST_SPEED * DT {
                    settled_at = Some((step, y));
                    break;
                }
                prev_y = y;
            }

            match settled_at {
                Some((step, y)) => {
                    println!("Settled after {step} steps at y={y:.4} (radius {radius})");
                }
                None => {
                    println!(
                        "Did not settle within 600 steps; last y={:.4}",
                        sim.body_pose(index).map(|p| p.position.y).unwrap_or(0.0)
                    );
                }
            }
        }
    }

    Ok(())
}
