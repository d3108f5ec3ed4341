// SYNOID Quantum Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use synoid_quantum::config::SimulationConfig;
use synoid_quantum::engine::random::seeded_or_entropy;
use synoid_quantum::engine::{OperationDispatcher, RandomWalkEvolver};
use synoid_quantum::presets::{Preset, PresetSystem};
use synoid_quantum::state::{EvolutionLoop, SharedStore};

#[derive(Parser)]
#[command(name = "synoid-quantum")]
#[command(about = "SYNOID Quantum State Simulator", long_about = None)]
struct Cli {
    /// JSON config file (defaults + SYNOID_* env vars otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tick a preset system N times and print the final state
    Simulate {
        /// consciousness, energy or multiverse
        #[arg(short, long, default_value = "consciousness")]
        preset: String,

        /// Number of ticks to apply
        #[arg(short, long, default_value_t = 100)]
        ticks: u64,

        /// Simulated time per tick (overrides config)
        #[arg(long)]
        time_step: Option<f64>,
    },

    /// Run one named operation against a fresh preset system
    Execute {
        #[arg(short, long, default_value = "energy")]
        preset: String,

        /// generate, transform, stabilize, amplify or distribute
        #[arg(short, long)]
        op: String,

        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Evolve a preset in the background and print metrics every second
    Watch {
        #[arg(short, long, default_value = "consciousness")]
        preset: String,

        /// Stop after this many seconds
        #[arg(short, long, default_value_t = 10)]
        secs: u64,
    },

    /// Print the effective configuration
    Config,
}

fn effective_config(path: Option<&PathBuf>, seed: Option<u64>) -> Result<SimulationConfig> {
    let mut config = match path {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    config.apply_env_overrides();
    if seed.is_some() {
        config.seed = seed;
    }
    config.validate().context("invalid simulation config")?;
    Ok(config)
}

fn build_preset(name: &str, config: &SimulationConfig) -> Result<PresetSystem> {
    let preset: Preset = name.parse()?;
    let mut rng = seeded_or_entropy(config.seed);
    Ok(preset.build(config.store_config(), &mut rng)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("--- SYNOID QUANTUM STATE SIMULATOR v0.1.1 ---");

    let args = Cli::parse();
    let config = effective_config(args.config.as_ref(), args.seed)?;

    match args.command {
        Commands::Simulate {
            preset,
            ticks,
            time_step,
        } => {
            let PresetSystem { mut store, metrics } = build_preset(&preset, &config)?;
            // Offset the seed so the walk does not replay the initialization draws.
            let rng = seeded_or_entropy(config.seed.map(|s| s.wrapping_add(1)));
            let mut evolver = RandomWalkEvolver::new(config.evolver_config(), rng)?.with_metrics(metrics);
            let dt = time_step.unwrap_or(config.time_step);

            info!("🌀 Simulating '{}' for {} ticks (dt = {})", preset, ticks, dt);
            let report = evolver.run(&mut store, dt, ticks)?;

            let output = serde_json::json!({
                "preset": preset,
                "report": report,
                "state": store.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Execute { preset, op, params } => {
            let PresetSystem { mut store, metrics } = build_preset(&preset, &config)?;
            let params: serde_json::Value =
                serde_json::from_str(&params).context("--params must be a JSON object")?;
            let dispatcher = OperationDispatcher::new(metrics);

            let result = dispatcher.execute(&mut store, &op, &params)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Watch { preset, secs } => {
            let PresetSystem { store, metrics } = build_preset(&preset, &config)?;
            let rng = seeded_or_entropy(config.seed.map(|s| s.wrapping_add(1)));
            let evolver = RandomWalkEvolver::new(config.evolver_config(), rng)?.with_metrics(metrics);
            let shared = SharedStore::new(store);

            let evolution = EvolutionLoop::start(
                shared.clone(),
                evolver,
                config.time_step,
                Duration::from_millis(config.tick_interval_ms),
            );
            info!("👁️ Watching '{}' for {}s. Press Ctrl+C to stop.", preset, secs);

            let deadline = tokio::time::sleep(Duration::from_secs(secs));
            tokio::pin!(deadline);
            let mut ticker = tokio::time::interval(Duration::from_secs(1));

            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    _ = tokio::signal::ctrl_c() => {
                        warn!("Interrupted.");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !evolution.is_running() {
                            warn!("Evolution loop stopped on its own.");
                            break;
                        }
                        if let Some(report) = evolution.last_report() {
                            println!("tick {:>5} | {}", report.tick, serde_json::to_string(&report.metrics)?);
                        }
                    }
                }
            }

            info!("{}", evolution.status_report());
            evolution.join().await;
            let snapshot = shared.snapshot().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
