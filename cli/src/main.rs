//! Stampede CLI - runs a workload simulation from a configuration file.

use anyhow::{bail, Context, Result};
use clap::Parser;
use stampede_config::{Backend, Config};
use stampede_sim::{
    Dispatcher, HttpDispatcher, KafkaDispatcher, NopDispatcher, Simulation,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Configuration-driven workload simulator.
#[derive(Parser, Debug)]
#[command(name = "stampede")]
#[command(about = "Generate synthetic traffic from a declarative simulation", long_about = None)]
struct Args {
    /// Path to the simulation configuration file
    #[arg(long, env = "CONFIG")]
    config: PathBuf,

    /// Number of executor workers
    #[arg(long, default_value_t = 16, env = "WORKERS")]
    workers: usize,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOGLEVEL")]
    log_level: Level,

    /// Comma-separated Kafka bootstrap brokers (kafka backend only)
    #[arg(long, env = "KAFKA_BROKERS", value_delimiter = ',')]
    kafka_brokers: Vec<String>,

    /// Client identifier presented to the Kafka brokers
    #[arg(long, default_value = "stampede_simulation", env = "KAFKA_CLIENT_ID")]
    kafka_client_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set the tracing subscriber")?;

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let dispatcher: Arc<dyn Dispatcher> = match config.backend {
        Backend::Nop => Arc::new(NopDispatcher),
        Backend::Http => Arc::new(HttpDispatcher::new()),
        Backend::Kafka => {
            if args.kafka_brokers.is_empty() {
                bail!("the kafka backend requires --kafka-brokers");
            }
            Arc::new(
                KafkaDispatcher::connect(
                    args.kafka_brokers.clone(),
                    args.kafka_client_id.clone(),
                )
                .await
                .context("failed to connect to kafka")?,
            )
        }
    };

    let simulation = Simulation::new(&config, dispatcher, args.workers)
        .context("invalid simulation configuration")?;
    info!(
        backend = ?config.backend,
        workers = args.workers,
        "simulation started"
    );

    tokio::select! {
        _ = shutdown_signal() => info!("shutdown signal received"),
        _ = simulation.wait() => info!("simulation complete"),
    }
    simulation.close().await;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(_) => {
                    let _ = ctrl_c.await;
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
