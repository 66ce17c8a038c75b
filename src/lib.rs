//! Stream Sim Library
//!
//! A multi-stream synthetic record generator for exercising data pipelines.
//!
//! # Features
//!
//! - Independent streams: each stream has its own schema, rate, state and outputs
//! - Derived fields: dependent fields computed from the same record's values
//! - Event injection: override records at chosen ticks or with a probability
//! - Multiple outputs: console, file, HTTP, Kafka (feature `kafka`) and MQTT (feature `mqtt`)
//!
//! # Crates
//!
//! - `sim_core` - values, stream state and configuration loading
//! - `sim_generator` - generator functions, transforms and the record generator
//! - `sim_output` - formatters and sinks
//! - `sim_scheduler` - per-stream loops and event injection
//!
//! # CLI Usage
//!
//! ```bash
//! # Run until Ctrl-C
//! stream-sim --config demos/sensors.yaml
//!
//! # Run for 30 seconds with debug logging
//! stream-sim --config demos/sensors.yaml --duration 30s --debug
//!
//! # Show available generator types and transforms
//! stream-sim --list-generators
//! ```

use anyhow::Context;
use clap::Parser;
use sim_core::SimulationConfig;
use sim_generator::{BasicFakeProvider, GeneratorRegistry};
use sim_scheduler::{Simulation, StreamReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod config;

pub use config::parse_duration;

#[derive(Parser, Clone, Debug)]
pub struct RunOpts {
    /// Path to a YAML or JSON simulation config
    #[arg(
        short,
        long,
        env = "STREAM_SIM_CONFIG",
        required_unless_present = "list_generators"
    )]
    pub config: Option<PathBuf>,

    /// Stop after this long (e.g. "30s", "5m", "250ms"); runs until Ctrl-C otherwise
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Print the available generator types and transforms, then exit
    #[arg(long)]
    pub list_generators: bool,
}

/// Registry used by the binary: built-in generators plus the word-list fake
/// provider.
pub fn default_registry() -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::with_builtins();
    registry.set_fake_provider(Arc::new(BasicFakeProvider::new()));
    registry
}

/// Human-readable listing of everything a schema may reference.
pub fn describe_registry(registry: &GeneratorRegistry) -> String {
    let mut out = String::from("Generator types:\n");
    for name in registry.generator_names() {
        out.push_str("  ");
        out.push_str(&name);
        out.push('\n');
    }
    out.push_str("Transforms:\n");
    for name in registry.transform_names() {
        out.push_str("  ");
        out.push_str(&name);
        out.push('\n');
    }
    out
}

/// Build every stream of `config` and run until `cancel` fires or `duration`
/// elapses.
pub async fn run_simulation(
    config: &SimulationConfig,
    registry: &GeneratorRegistry,
    duration: Option<Duration>,
    cancel: CancellationToken,
) -> anyhow::Result<Vec<StreamReport>> {
    let simulation = Simulation::build(config, registry)
        .await
        .context("Failed to start simulation")?;
    info!("Streams: {}", simulation.stream_names().join(", "));

    if let Some(duration) = duration {
        let timer = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    info!("Duration of {duration:?} elapsed, stopping");
                    timer.cancel();
                }
            }
        });
    }

    Ok(simulation.run(cancel).await)
}

/// Read `path` and run it. See [`run_simulation`].
pub async fn run_config_file(
    path: &std::path::Path,
    registry: &GeneratorRegistry,
    duration: Option<Duration>,
    cancel: CancellationToken,
) -> anyhow::Result<Vec<StreamReport>> {
    let config = SimulationConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    run_simulation(&config, registry, duration, cancel).await
}
