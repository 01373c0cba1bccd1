//! Poolwatch live ingestion daemon.
//!
//! Tails a bitcoind debug log, extracts mempool acceptance events (with
//! replacement linkage), and ships batches to object storage as Parquet
//! files or to a Kafka topic as JSON messages.
//!
//! # Usage
//!
//! ```bash
//! # Ship hourly Parquet files to a GCS bucket
//! HOSTNAME=node-1 SOURCE_LABEL=mainnet BUCKET_NAME=mempool-archive \
//!     poolwatch-ingest --sink parquet
//!
//! # Publish each event to a Kafka topic
//! HOSTNAME=node-1 SOURCE_LABEL=mainnet \
//! KAFKA_BROKERS=localhost:9092 TOPIC_ID=mempool-events \
//!     poolwatch-ingest --sink kafka --log-file /var/lib/bitcoind/debug.log
//! ```
//!
//! # Graceful Shutdown
//!
//! The daemon handles SIGINT (Ctrl+C) and SIGTERM for graceful shutdown:
//! 1. Stops pulling lines from the log
//! 2. Performs one final flush of the batch buffer
//! 3. Waits for in-flight deliveries to be acknowledged
//! 4. Exits cleanly

use anyhow::{Context, Result};
use clap::Parser;
use metrics::gauge;
use poolwatch_core::metrics::{init_metrics, start_metrics_server};
use poolwatch_ingest::{
    BatchSink, Config, KafkaSink, KafkaSinkConfig, LogFollower, ParquetSink, ParquetSinkConfig,
    ShutdownFlag, SinkKind, SinkSettings, Watcher, WatcherConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Poolwatch live ingestion daemon.
#[derive(Parser, Debug)]
#[command(name = "poolwatch-ingest")]
#[command(about = "Mempool acceptance log tailing and shipping daemon")]
#[command(version)]
struct Args {
    /// Path to the bitcoind debug log to follow
    #[arg(long, default_value = "/home/bitcoin/.bitcoin/debug.log")]
    log_file: PathBuf,

    /// Sink variant to ship batches to
    #[arg(long, value_enum, default_value = "parquet")]
    sink: SinkKind,

    /// Sleep between polls when the log has no new data (milliseconds)
    #[arg(long, default_value = "100")]
    poll_interval_ms: u64,

    /// Elapsed time since the last flush that triggers a new one (seconds)
    #[arg(long, default_value = "3600")]
    flush_interval_secs: u64,

    /// Cap on unresolved replacement linkages (0 = unbounded)
    #[arg(long, default_value = "0")]
    max_replacements: usize,

    /// Maximum Kafka publishes awaiting acknowledgment
    #[arg(long, default_value = "1000")]
    max_in_flight: usize,

    /// Metrics HTTP server port (0 to disable)
    #[arg(long, default_value = "9090")]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap())
                .add_directive("poolwatch_ingest=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    // Top-level error boundary: any escaping fault becomes a structured
    // fatal log entry and a non-zero exit code.
    if let Err(e) = run(args).await {
        tracing::error!("Unhandled error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    tracing::info!("Poolwatch ingestion daemon starting...");

    // Required configuration is validated before any file is opened.
    let config = Config::from_env(args.sink)?;

    // Initialize metrics
    if args.metrics_port > 0 {
        let metrics_handle = init_metrics();
        start_metrics_server(args.metrics_port, metrics_handle).await?;
        gauge!("ingest_running").set(1.0);
    }

    // Set up graceful shutdown
    let shutdown = ShutdownFlag::new();
    let shutdown_handler = shutdown.clone();

    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received, stopping gracefully...");
        shutdown_handler.trigger();
    })
    .context("Failed to set signal handler")?;

    tracing::info!("Configuration:");
    tracing::info!("  Log file: {}", args.log_file.display());
    tracing::info!("  Poll interval: {} ms", args.poll_interval_ms);
    tracing::info!("  Flush interval: {} s", args.flush_interval_secs);
    tracing::info!("  Host: {}", config.host);
    tracing::info!("  Source: {}", config.source);

    let sink = build_sink(&config, &args)?;

    let follower = LogFollower::open(&args.log_file)
        .with_context(|| format!("Failed to open log file {:?}", args.log_file))?;

    let watcher_config = WatcherConfig {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        flush_interval: Duration::from_secs(args.flush_interval_secs),
        max_replacements: (args.max_replacements > 0).then_some(args.max_replacements),
    };

    let watcher = Watcher::new(follower, sink, shutdown, watcher_config);
    let stats = watcher.run().await?;

    gauge!("ingest_running").set(0.0);

    // Print summary
    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("SHUTDOWN COMPLETE");
    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("Lines read:               {}", stats.lines_read);
    tracing::info!("Acceptances extracted:    {}", stats.accepts_extracted);
    tracing::info!("Replacements recorded:    {}", stats.replacements_recorded);
    tracing::info!("Replacements resolved:    {}", stats.replacements_resolved);
    tracing::info!("Batches flushed:          {}", stats.batches_flushed);
    tracing::info!("Events shipped:           {}", stats.events_shipped);
    tracing::info!("Unresolved replacements:  {}", stats.unresolved_replacements);

    Ok(())
}

/// Build the sink adapter for the active variant.
fn build_sink(config: &Config, args: &Args) -> Result<Box<dyn BatchSink>> {
    let sink: Box<dyn BatchSink> = match &config.sink {
        SinkSettings::Parquet { bucket } => Box::new(ParquetSink::gcs(
            bucket,
            ParquetSinkConfig {
                host: config.host.clone(),
                source: config.source.clone(),
            },
        )?),
        SinkSettings::Kafka { brokers, topic } => Box::new(KafkaSink::connect(KafkaSinkConfig {
            brokers: brokers.clone(),
            topic: topic.clone(),
            host: config.host.clone(),
            source: config.source.clone(),
            max_in_flight: args.max_in_flight,
            message_timeout_ms: 30_000,
        })?),
    };

    Ok(sink)
}
