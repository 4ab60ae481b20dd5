use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, ensure};
use clap::{Parser, Subcommand};
use glam::DVec3;
use gridspace_common::IndexConfig;
use gridspace_index::{Handle, SpatialIndex, Sphere};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridspace-cli", about = "CLI tool for gridspace operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Move entities from many threads while querying around each move
    Soak {
        /// Number of entities to create
        #[arg(short, long, default_value = "1000")]
        entities: usize,
        /// Worker threads sharing the entities
        #[arg(short, long, default_value = "4")]
        threads: usize,
        /// Moves per entity
        #[arg(long, default_value = "100")]
        steps: usize,
        /// Seed for deterministic positions
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Half-width of the square area entities start in
        #[arg(long, default_value = "1000.0")]
        extent: f64,
        /// Override the configured tile size
        #[arg(long)]
        tile_size: Option<f64>,
        /// JSON index configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Swap two entities between adjacent cells from two threads
    Swap {
        /// Number of round trips per thread
        #[arg(short, long, default_value = "1000")]
        rounds: usize,
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
            println!("gridspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", gridspace_common::crate_info());
            println!("index: {}", gridspace_index::crate_info());
            println!("default config: {:?}", IndexConfig::default());
        }
        Commands::Soak {
            entities,
            threads,
            steps,
            seed,
            extent,
            tile_size,
            config,
        } => {
            let config = load_config(config, tile_size)?;
            soak(config, entities, threads, steps, seed, extent)?;
        }
        Commands::Swap { rounds } => swap(rounds)?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>, tile_size: Option<f64>) -> anyhow::Result<IndexConfig> {
    let mut config = match path {
        Some(path) => IndexConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => IndexConfig::default(),
    };
    if let Some(tile_size) = tile_size {
        config.tile_size = tile_size;
    }
    config.validate()?;
    Ok(config)
}

fn soak(
    config: IndexConfig,
    entities: usize,
    threads: usize,
    steps: usize,
    seed: u64,
    extent: f64,
) -> anyhow::Result<()> {
    let _span = tracing::info_span!("soak", entities, threads, steps).entered();
    println!(
        "Soak: {entities} entities, {threads} threads, {steps} steps, tile={}",
        config.tile_size
    );

    let index: SpatialIndex<usize> = SpatialIndex::new(config)?;
    let mut rng = Rng(seed);

    let start = Instant::now();
    let handles: Vec<Handle<usize>> = (0..entities)
        .map(|i| {
            let pos = DVec3::new(rng.range(extent), rng.range(extent), rng.range(extent));
            index.create(i, pos)
        })
        .collect();
    println!(
        "Created in {:?}: partitions={}",
        start.elapsed(),
        index.partition_count()
    );

    let step_size = config.tile_size;
    let radius = config.tile_size / 2.0;
    let chunk = entities.div_ceil(threads.max(1)).max(1);

    let start = Instant::now();
    let misses = std::thread::scope(|s| -> anyhow::Result<usize> {
        let workers: Vec<_> = handles
            .chunks(chunk)
            .enumerate()
            .map(|(t, owned)| {
                let index = &index;
                s.spawn(move || {
                    let mut rng = Rng(seed ^ (t as u64 + 1).wrapping_mul(0x9e37_79b9));
                    let mut buffer = Vec::new();
                    let mut misses = 0usize;
                    for _ in 0..steps {
                        for handle in owned {
                            let pos = handle.position()
                                + DVec3::new(rng.range(step_size), 0.0, rng.range(step_size));
                            index.update(handle, pos);

                            buffer.clear();
                            buffer = index.query(&Sphere::new(pos, radius), buffer);
                            if !buffer.contains(handle) {
                                misses += 1;
                            }
                        }
                    }
                    misses
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().map_err(|_| anyhow::anyhow!("soak worker panicked")))
            .sum()
    })?;
    let elapsed = start.elapsed();
    let moves = entities.saturating_mul(steps).max(1);
    println!(
        "Moved + queried in {elapsed:?} ({:?}/move), partitions={}",
        elapsed.div_f64(moves as f64),
        index.partition_count()
    );

    ensure!(misses == 0, "{misses} queries missed the entity that just moved");
    let stats = index.stats();
    ensure!(
        stats.entities == entities,
        "index holds {} entities, expected {entities}",
        stats.entities
    );
    println!(
        "Stats: partitions={}, occupied={}, entities={}",
        stats.partitions, stats.occupied_partitions, stats.entities
    );

    for handle in handles {
        index.remove(handle);
    }
    ensure!(index.entity_count() == 0, "entities left after removing all");
    println!("Removed all: OK");

    Ok(())
}

fn swap(rounds: usize) -> anyhow::Result<()> {
    let _span = tracing::info_span!("swap", rounds).entered();
    println!("Swap: {rounds} rounds per thread");

    let index: SpatialIndex<char> = SpatialIndex::with_tile_size(10.0)?;
    let left = DVec3::new(5.0, 0.0, 5.0);
    let right = DVec3::new(15.0, 0.0, 5.0);
    let a = index.create('a', left);
    let b = index.create('b', right);

    let start = Instant::now();
    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..rounds {
                index.update(&a, right);
                index.update(&a, left);
            }
        });
        s.spawn(|| {
            for _ in 0..rounds {
                index.update(&b, left);
                index.update(&b, right);
            }
        });
    });
    println!("Completed in {:?}", start.elapsed());

    for handle in [&a, &b] {
        let holders = [index.cell_for(left), index.cell_for(right)]
            .into_iter()
            .filter_map(|cell| index.partition(cell))
            .filter(|p| p.read().contains(handle))
            .count();
        ensure!(
            holders == 1,
            "entity {} held by {holders} partitions",
            handle.value()
        );
    }
    println!("Each entity in exactly one partition: OK");

    Ok(())
}

/// Splitmix64 stream for reproducible positions without pulling in an RNG crate.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform value in `[-half, half)`.
    fn range(&mut self, half: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        (unit * 2.0 - 1.0) * half
    }
}
