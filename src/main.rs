use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use funding_tracker::config::{ApiConfig, CollectorConfig};
use funding_tracker::utils::init_log;
use funding_tracker::{Cli, CsvStore, HyperliquidProvider, SnapshotCollector, SnapshotRow, StorePaths};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    // 1. Setup Logging
    init_log();

    // 2. Configuration
    let args = Cli::parse();
    let paths = StorePaths::new(&args.data_dir);
    let mut config = CollectorConfig::default();
    if let Some(hours) = args.interval_hours {
        config.interval = Duration::from_secs(hours.max(1) * 3600);
    }

    // 3. Wire provider and store
    let provider = HyperliquidProvider::new(ApiConfig::default())
        .context("Failed to build HTTP client")?;
    let store = CsvStore::<SnapshotRow>::open(paths.snapshot_csv()).await?;
    log::info!("Snapshot store: {}", store.path().display());

    let collector = SnapshotCollector::new(&provider, &store, config);

    // 4. Run
    if args.once {
        return Ok(if collector.collect_once().await {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    collector.run_scheduler().await?;
    Ok(ExitCode::SUCCESS)
}
