//! Command-line interface for stream-sim
//!
//! # Usage Examples
//!
//! ```bash
//! # Run every stream in a config until Ctrl-C
//! stream-sim --config demos/sensors.yaml
//!
//! # Stop after five minutes
//! stream-sim --config demos/sensors.yaml --duration 5m
//!
//! # Verbose logging (RUST_LOG is ignored when --debug is set)
//! stream-sim --config demos/sensors.yaml --debug
//! ```

use clap::Parser;
use stream_sim::{default_registry, describe_registry, run_config_file, RunOpts};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stream-sim")]
#[command(about = "Generate synthetic record streams at a controlled rate")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    opts: RunOpts,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = default_registry();

    if cli.opts.list_generators {
        print!("{}", describe_registry(&registry));
        return Ok(());
    }

    let Some(config_path) = cli.opts.config else {
        anyhow::bail!("--config is required");
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    let reports = run_config_file(&config_path, &registry, cli.opts.duration, cancel).await?;

    for report in &reports {
        info!(
            "Stream '{}': {} ticks, {} generated, {} injected, {} send failures, {} tick failures in {:.2}s ({:.1} records/s)",
            report.stream,
            report.ticks,
            report.generated,
            report.injected,
            report.send_failures,
            report.tick_failures,
            report.elapsed.as_secs_f64(),
            report.records_per_second(),
        );
    }

    Ok(())
}
