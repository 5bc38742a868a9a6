//! dumpstat - e621 export ingestion tool

use anyhow::Result;
use clap::{Parser, Subcommand};
use dumpstat_common::logging::{init_logging, LogConfig, LogLevel};
use dumpstat_common::units::format_bytes;
use dumpstat_ingest::aggregate::DatasetAggregator;
use dumpstat_ingest::pipeline::Progress;
use dumpstat_ingest::scheduler::Scheduler;
use dumpstat_ingest::{DatasetType, DumpService, IngestConfig, MetricsRegistry};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dumpstat")]
#[command(author, version, about = "e621 database export ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download and extract the newest dump of every dataset type
    Sync,

    /// List decompressed dumps in the cache
    List,

    /// Delete everything in the cache directory
    Clear,

    /// Aggregate one cached dump and print its metric families as JSON
    Ingest {
        /// Dataset type, e.g. posts or tag_aliases
        dataset: DatasetType,
    },

    /// Run one full cycle and print every metric family as JSON
    Cycle,

    /// Run cycles on the configured interval until interrupted
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("dumpstat")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = IngestConfig::from_env()?;
    info!(base_url = %config.base_url, cache_dir = %config.cache_dir.display(), "Configuration loaded");
    let service = DumpService::new(config)?;

    match cli.command {
        Command::Sync => {
            let report = service.ensure_latest().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_complete() {
                anyhow::bail!("{} dumps failed to sync", report.failed.len());
            }
        },
        Command::List => {
            for file in service.list_cached().await? {
                println!("{}\t{}", file.file_name(), format_bytes(file.size));
            }
        },
        Command::Clear => {
            let removed = service.clear_cache().await?;
            info!("Removed {} cache entries", removed);
        },
        Command::Ingest { dataset } => {
            let mut aggregator = DatasetAggregator::for_dataset(dataset, service.config());
            let stats = service
                .ingest(dataset, &mut aggregator, &mut |_: Progress| {})
                .await?;
            info!(
                "Ingested {} rows of {} ({} rejected)",
                stats.rows_processed, dataset, stats.rows_rejected
            );
            println!("{}", serde_json::to_string_pretty(&aggregator.into_families())?);
        },
        Command::Cycle => {
            let registry = MetricsRegistry::new();
            let report = service.run_cycle(&registry).await?;
            info!(
                "Cycle finished: {} succeeded, {} failed",
                report.passes.len(),
                report.failed.len()
            );
            println!("{}", serde_json::to_string_pretty(&registry.snapshot())?);
        },
        Command::Run => {
            let interval = service.config().interval();
            let scheduler = Scheduler::new(Arc::new(service), Arc::new(MetricsRegistry::new()), interval);
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        },
    }

    Ok(())
}
