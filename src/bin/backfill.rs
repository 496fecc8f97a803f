use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use funding_tracker::config::{ApiConfig, BackfillConfig, COLLECTION, PERSISTENCE, StorePaths};
use funding_tracker::data::{
    Backfill, BackfillReport, FundingDataProvider, HyperliquidProvider, RecordStore, StoreKind,
    open_history_store,
};
use funding_tracker::domain::FundingObservation;
use funding_tracker::utils::{epoch_ms_to_date_string, init_log};

#[derive(Parser, Debug)]
#[command(author, version, about = "Backfill Hyperliquid funding history", long_about = None)]
struct Args {
    /// Comma-separated symbols, e.g. BTC,ETH (default: every listed perp)
    #[arg(long, value_delimiter = ',')]
    coins: Vec<String>,

    /// Only the N symbols with the largest open interest (bare flag: 10)
    #[arg(long)]
    top: Option<Option<usize>>,

    /// Start of history in epoch ms (0 = from inception)
    #[arg(long, default_value_t = 0)]
    start_ms: i64,

    /// Continue each symbol from its last stored timestamp
    #[arg(long, default_value_t = false)]
    resume: bool,

    #[arg(long, value_enum, default_value_t = StoreKind::Csv)]
    store: StoreKind,

    /// Directory holding the data files
    #[arg(long, default_value = PERSISTENCE.files.directory)]
    data_dir: PathBuf,
}

async fn resolve_symbols(args: &Args, provider: &HyperliquidProvider) -> Result<Vec<String>> {
    if !args.coins.is_empty() {
        return Ok(args
            .coins
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect());
    }
    if let Some(top) = args.top {
        let limit = top.unwrap_or(COLLECTION.top_symbols_limit);
        return provider
            .top_symbols_by_open_interest(limit)
            .await
            .context("Failed to fetch symbols by open interest");
    }
    provider
        .list_symbols()
        .await
        .context("Failed to fetch symbol list")
}

/// Runs the backfill and returns the report with the store's row count afterwards.
async fn run<P, S>(
    provider: &P,
    store: &S,
    config: BackfillConfig,
    symbols: &[String],
) -> Result<(BackfillReport, usize)>
where
    P: FundingDataProvider + ?Sized,
    S: RecordStore<FundingObservation> + ?Sized,
{
    let report = Backfill::new(provider, store, config).run(symbols).await;
    let total = store
        .load_all()
        .await
        .context("Failed to count stored rows")?
        .len();
    log::info!("Store now holds {} rows", total);
    Ok((report, total))
}

/// A run that added nothing to an empty store produced no history at all.
fn is_failed_run(report: &BackfillReport, total_rows: usize) -> bool {
    report.inserted() == 0 && total_rows == 0
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 1. Setup Logging
    init_log();

    // 2. Configuration
    let args = Args::parse();
    let paths = StorePaths::new(&args.data_dir);
    let config = BackfillConfig {
        start_time_ms: args.start_ms,
        resume: args.resume,
        ..BackfillConfig::default()
    };
    let provider =
        HyperliquidProvider::new(ApiConfig::default()).context("Failed to build HTTP client")?;

    // 3. Symbols
    let symbols = resolve_symbols(&args, &provider).await?;
    if symbols.is_empty() {
        log::error!("No symbols to backfill. Aborting.");
        return Ok(ExitCode::FAILURE);
    }
    log::info!(
        "🚀 Backfilling {} symbol(s) from {}{}",
        symbols.len(),
        epoch_ms_to_date_string(config.start_time_ms),
        if config.resume { " (resume)" } else { "" }
    );

    // 4. Run against the chosen store
    let store = open_history_store(args.store, &paths).await?;
    let (report, total) = run(&provider, store.as_ref(), config, &symbols).await?;

    // 5. Summary
    log::info!("✅ Backfill finished: {}", report);
    let abandoned = report.abandoned();
    if !abandoned.is_empty() {
        log::warn!("⚠ Abandoned: {}", abandoned.join(", "));
    }
    if is_failed_run(&report, total) {
        log::error!("No funding history was stored.");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use funding_tracker::data::{BackfillOutcome, MemoryStore, MergeOutcome, SymbolBackfill};

    #[test]
    fn parses_coin_list_and_store_kind() {
        let args = Args::parse_from([
            "funding-backfill",
            "--coins",
            "BTC,ETH",
            "--store",
            "sqlite",
            "--resume",
        ]);
        assert_eq!(args.coins, vec!["BTC".to_string(), "ETH".to_string()]);
        assert_eq!(args.store, StoreKind::Sqlite);
        assert!(args.resume);
        assert_eq!(args.top, None);

        let args = Args::parse_from(["funding-backfill", "--top"]);
        assert_eq!(args.top, Some(None));
        assert_eq!(args.store, StoreKind::Csv);
        assert_eq!(args.start_ms, 0);
    }


    fn report_with(inserted: usize, outcome: BackfillOutcome) -> BackfillReport {
        BackfillReport {
            symbols: vec![SymbolBackfill {
                symbol: "BTC".into(),
                requests: 1,
                fetched: inserted,
                dropped: 0,
                merged: MergeOutcome {
                    inserted,
                    duplicates: 0,
                },
                outcome,
            }],
        }
    }

    #[test]
    fn nothing_inserted_into_empty_store_fails_the_run() {
        let abandoned = report_with(0, BackfillOutcome::Abandoned("503".into()));
        assert!(is_failed_run(&abandoned, 0));
        // Already up to date: nothing new, but the store has history.
        assert!(!is_failed_run(&report_with(0, BackfillOutcome::Complete), 1234));
        assert!(!is_failed_run(&report_with(10, BackfillOutcome::Complete), 10));
    }

    #[tokio::test]
    async fn run_reports_rows_held_by_the_store() {
        let provider = HyperliquidProvider::new(ApiConfig::default()).unwrap();
        let store = MemoryStore::<FundingObservation>::new();
        let (report, total) = run(&provider, &store, BackfillConfig::default(), &[])
            .await
            .unwrap();
        assert!(report.symbols.is_empty());
        assert_eq!(total, 0);
        assert!(is_failed_run(&report, total));
    }
}
