//! Ferry - PRoPHET DTN Simulation
//!
//! Runs delay-tolerant routing scenarios over scheduled contacts and prints
//! delivery statistics.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use ferry_core::SimTime;
use ferry_dtn::ProphetConfig;
use ferry_logging::{ConsoleOutput, FerrySubscriberBuilder, LogConfig, WorkerGuard};
use ferry_simulation::{RingParams, World, WorldConfig, scenarios};

#[derive(Parser)]
#[command(
    name = "ferry-sim",
    about = "Discrete-event simulation of PRoPHET routing",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write a JSONL trace of the run to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Logging configuration as JSON (overrides --log-dir)
    #[arg(long, global = true)]
    log_config: Option<PathBuf>,

    /// Router configuration as JSON
    #[arg(long, global = true)]
    router_config: Option<PathBuf>,

    /// Seconds between beacons
    #[arg(long, global = true, default_value = "1.0")]
    beacon_period: f64,

    /// Milliseconds of transmission time per byte
    #[arg(long, global = true, default_value = "1.0")]
    per_byte_ms: f64,

    /// Print statistics as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Two nodes, direct delivery on first contact
    Direct,

    /// Three nodes, delivery through a carrier
    Relay,

    /// Random contacts between ring neighbors
    Ring {
        /// Number of nodes (max 26)
        #[arg(short, long, default_value = "6")]
        nodes: usize,

        /// Number of bundles to create
        #[arg(short, long, default_value = "20")]
        bundles: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Simulated seconds to run
        #[arg(long, default_value = "1800")]
        horizon: u64,

        /// Payload bytes per bundle
        #[arg(long, default_value = "512")]
        size: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli)?;
    let config = world_config(&cli)?;

    let world = match cli.command {
        Commands::Direct => scenarios::direct(config)?,
        Commands::Relay => scenarios::relay(config)?,
        Commands::Ring {
            nodes,
            bundles,
            seed,
            horizon,
            size,
        } => {
            let params = RingParams {
                nodes,
                bundles,
                seed,
                horizon: SimTime::from_secs(horizon),
                bundle_size: size,
                ..RingParams::default()
            };
            scenarios::ring(config, &params)?
        }
    };

    report(&world, cli.json)
}

fn init_logging(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let mut config = match (&cli.log_config, &cli.log_dir) {
        (Some(path), _) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            LogConfig::from_json(&json)?
        }
        (None, Some(dir)) => LogConfig::simulation(dir.clone()),
        (None, None) => LogConfig {
            console: ConsoleOutput::Pretty { ansi: true },
            ..LogConfig::default()
        },
    };
    if cli.verbose {
        config.level = "debug".to_string();
    }

    Ok(FerrySubscriberBuilder::new().with_config(config).init()?)
}

fn world_config(cli: &Cli) -> anyhow::Result<WorldConfig> {
    let router = match &cli.router_config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<ProphetConfig>(&json)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => ProphetConfig::default(),
    };
    for warning in router.validate() {
        warn!(%warning, "router configuration");
    }

    let beacon_period = Duration::try_from_secs_f64(cli.beacon_period)
        .context("beacon period must be a non-negative number of seconds")?;
    let per_byte_delay = Duration::try_from_secs_f64(cli.per_byte_ms / 1000.0)
        .context("per-byte delay must be a non-negative number of milliseconds")?;

    Ok(WorldConfig {
        router,
        beacon_period,
        per_byte_delay,
        ..WorldConfig::default()
    })
}

fn report(world: &World, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(world.stats())?);
        return Ok(());
    }

    println!("\n=== Results at {} ===", world.now());
    println!("{}", world.stats());
    println!("\nNode state:");
    for node in world.nodes() {
        let router = node.router();
        println!(
            "  {}: {} stored ({} bytes), {} known delivered, {} neighbors",
            node.id(),
            router.store().len(),
            router.store().used_bytes(),
            router.known_delivered().len(),
            router.table().known_neighbors(),
        );
    }
    Ok(())
}
