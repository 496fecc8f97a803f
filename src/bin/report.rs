use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use funding_tracker::analysis::{
    HistoryQuery, HistoryView, RankedSymbol, RankingDisplay, SnapshotView, SymbolSummary,
    load_history_series,
};
use funding_tracker::config::{AnalysisConfig, PERSISTENCE, StorePaths};
use funding_tracker::data::{CsvStore, RecordStore, StoreKind, open_history_store};
use funding_tracker::domain::SnapshotRow;
use funding_tracker::models::DateWindow;
use funding_tracker::utils::{TimeUtils, init_log, now_utc, parse_date};
use tabled::{Table, Tabled, settings::Style};

#[derive(Parser, Debug)]
#[command(author, version, about = "Funding-rate dashboard tables", long_about = None)]
struct Args {
    /// Show the live-snapshot dashboard instead of the history dashboard
    #[arg(long, default_value_t = false)]
    snapshots: bool,

    /// Comma-separated symbols to chart (default: BTC, ETH, SOL, ARB, DOGE when present)
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// First date of the window, YYYY-MM-DD
    #[arg(long, value_parser = date_arg)]
    from: Option<NaiveDate>,

    /// Last date of the window, YYYY-MM-DD
    #[arg(long, value_parser = date_arg)]
    to: Option<NaiveDate>,

    /// Keep symbols whose rate is zero most of the time
    #[arg(long, default_value_t = false)]
    include_inactive: bool,

    /// Snapshot dashboard: trailing days of polls to count
    #[arg(long, default_value_t = 7)]
    days: i64,

    /// Latest hourly rows printed per selected symbol
    #[arg(long, default_value_t = 10)]
    rows: usize,

    /// Backend the history was backfilled into
    #[arg(long, value_enum, default_value_t = StoreKind::Csv)]
    store: StoreKind,

    /// Directory holding the data files
    #[arg(long, default_value = PERSISTENCE.files.directory)]
    data_dir: PathBuf,
}

fn date_arg(text: &str) -> Result<NaiveDate, String> {
    parse_date(text).ok_or_else(|| format!("expected YYYY-MM-DD, got '{}'", text))
}

fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v))
}

fn fmt_num(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Obs")]
    observations: usize,
    #[tabled(rename = "Current APR")]
    latest: String,
    #[tabled(rename = "7d Avg APR")]
    recent: String,
    #[tabled(rename = "Mean APR")]
    mean: String,
    #[tabled(rename = "Volatility")]
    volatility: String,
    #[tabled(rename = "Carry Index")]
    final_index: String,
    #[tabled(rename = "Gross Return")]
    gross: String,
    #[tabled(rename = "Annualized Return")]
    annualized: String,
    #[tabled(rename = "Days")]
    days: String,
}

#[derive(Tabled)]
struct RankRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Mean APR")]
    mean: String,
}

#[derive(Tabled)]
struct VolatilityRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Volatility")]
    volatility: String,
    #[tabled(rename = "Tier")]
    tier: String,
}

#[derive(Tabled)]
struct HeatmapRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Mean APR")]
    mean: String,
}

#[derive(Tabled)]
struct SnapshotTableRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Hourly Rate")]
    rate: String,
    #[tabled(rename = "APR")]
    apr: String,
    #[tabled(rename = "Mark Price")]
    mark: String,
    #[tabled(rename = "24h Volume")]
    volume: String,
    #[tabled(rename = "Open Interest")]
    open_interest: String,
}

fn print_table<T: Tabled>(title: &str, rows: Vec<T>) {
    println!("\n{}", title);
    if rows.is_empty() {
        println!("  (no data)");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn rank_rows(ranked: &[RankedSymbol], first_rank: usize) -> Vec<RankRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(i, r)| RankRow {
            rank: first_rank + i,
            symbol: r.symbol.clone(),
            mean: fmt_pct(Some(r.mean_annualized)),
        })
        .collect()
}

fn fmt_bound(date: Option<NaiveDate>) -> String {
    date.map_or_else(
        || "open".to_string(),
        |d| d.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
    )
}

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Time (UTC)")]
    timestamp: String,
    #[tabled(rename = "APR")]
    apr: String,
    #[tabled(rename = "30d Avg APR")]
    trailing: String,
    #[tabled(rename = "Carry Index")]
    index: String,
    #[tabled(rename = "Premium")]
    premium: String,
}

fn point_rows(summary: &SymbolSummary, rows: usize) -> Vec<PointRow> {
    summary
        .tail(rows)
        .iter()
        .map(|p| PointRow {
            timestamp: p.timestamp.format(TimeUtils::STANDARD_DATETIME_FORMAT).to_string(),
            apr: fmt_pct(Some(p.annualized)),
            trailing: fmt_pct(Some(p.trailing_average)),
            index: format!("{:.4}", p.carry_index),
            premium: p.premium_pct.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}%", v)),
        })
        .collect()
}

/// `--from`/`--to` as given; with neither, the view applies the default start date.
fn history_query(args: &Args) -> HistoryQuery {
    HistoryQuery {
        symbols: (!args.symbols.is_empty()).then(|| args.symbols.clone()),
        window: (args.from.is_some() || args.to.is_some())
            .then(|| DateWindow::new(args.from, args.to)),
        include_inactive: args.include_inactive,
    }
}

fn print_history(view: &HistoryView, rows: usize) {
    match view.window {
        Some(window) => println!(
            "Funding history {} to {}: {} active symbol(s), {} selected",
            fmt_bound(window.start),
            fmt_bound(window.end),
            view.available.len(),
            view.selected.len()
        ),
        None => println!("No funding history stored yet. Run funding-backfill first."),
    }

    let summaries = view
        .summaries
        .iter()
        .map(|s| SummaryRow {
            symbol: s.symbol.clone(),
            observations: s.observations,
            latest: fmt_pct(s.latest_annualized),
            recent: fmt_pct(s.recent_average),
            mean: fmt_pct(s.mean_annualized),
            volatility: fmt_num(s.volatility),
            final_index: fmt_num(s.metrics.map(|m| m.final_index)),
            gross: fmt_pct(s.metrics.map(|m| m.gross_return)),
            annualized: fmt_pct(s.metrics.map(|m| m.annualized_return)),
            days: s
                .metrics
                .map_or_else(|| "n/a".to_string(), |m| m.days_in_period.to_string()),
        })
        .collect();
    print_table("Selected symbols", summaries);

    match &view.ranking {
        RankingDisplay::All(all) => print_table("Ranking by mean APR", rank_rows(all, 1)),
        RankingDisplay::Tails { top, bottom, total } => {
            print_table("Top funding", rank_rows(top, 1));
            print_table("Bottom funding", rank_rows(bottom, total - bottom.len() + 1));
        }
    }

    let volatility = view
        .volatility
        .iter()
        .map(|v| VolatilityRow {
            symbol: v.symbol.clone(),
            volatility: fmt_num(Some(v.volatility)),
            tier: v.tier.to_string(),
        })
        .collect();
    print_table("Volatility (full history)", volatility);

    let heatmap = view
        .heatmap
        .iter()
        .map(|c| HeatmapRow {
            date: c.date.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
            symbol: c.symbol.clone(),
            mean: fmt_pct(Some(c.mean_annualized)),
        })
        .collect();
    print_table("Daily mean APR", heatmap);

    if rows > 0 {
        for summary in &view.summaries {
            print_table(
                &format!("{}: latest {} hour(s)", summary.symbol, rows),
                point_rows(summary, rows),
            );
        }
    }
}

fn print_snapshots(view: &SnapshotView) {
    match view.latest_poll {
        Some(ts) => println!(
            "Latest poll {} UTC: {} symbol(s), {} row(s) in window",
            ts.format(TimeUtils::STANDARD_DATETIME_FORMAT),
            view.latest.len(),
            view.recent.len()
        ),
        None => println!("No snapshots stored yet. Run funding-collector first."),
    }

    let rows = view
        .latest
        .iter()
        .map(|r: &SnapshotRow| SnapshotTableRow {
            symbol: r.symbol.clone(),
            rate: format!("{:.6}%", r.funding_rate * 100.0),
            apr: fmt_pct(Some(funding_tracker::analysis::annualize(r.funding_rate))),
            mark: fmt_num(r.mark_price),
            volume: fmt_num(r.day_ntl_vlm),
            open_interest: fmt_num(r.open_interest),
        })
        .collect();
    print_table("Current funding rates", rows);
}

#[tokio::main]
async fn main() -> Result<()> {
    init_log();
    let args = Args::parse();
    let paths = StorePaths::new(&args.data_dir);

    if args.snapshots {
        let store = CsvStore::<SnapshotRow>::open(paths.snapshot_csv()).await?;
        let rows = store.load_all().await?;
        print_snapshots(&SnapshotView::build(&rows, args.days, now_utc()));
        return Ok(());
    }

    let config = AnalysisConfig::default();
    let store = open_history_store(args.store, &paths).await?;
    let series = load_history_series(store.as_ref()).await?;

    let view = HistoryView::build(&series, &history_query(&args), &config);
    print_history(&view, args.rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use funding_tracker::domain::FundingObservation;
    use funding_tracker::models::group_into_series;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    /// Hourly BTC history covering 2025-01-01 through 2025-01-04.
    fn four_days() -> Vec<funding_tracker::models::SymbolSeries> {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let rows = (0..96)
            .map(|h| FundingObservation::new("BTC", start + Duration::hours(h), 0.0001))
            .collect();
        group_into_series(rows)
    }

    #[test]
    fn to_alone_leaves_the_start_open() {
        let args = Args::parse_from(["funding-report", "--to", "2025-01-02"]);
        let query = history_query(&args);
        assert_eq!(query.window, Some(DateWindow::new(None, Some(date(2)))));

        // A configured default start after `--to` must not pull the window forward.
        let config = AnalysisConfig {
            default_window_start: Some(date(3)),
            ..AnalysisConfig::default()
        };
        let view = HistoryView::build(&four_days(), &query, &config);
        assert_eq!(view.window, Some(DateWindow::new(Some(date(1)), Some(date(2)))));

        let btc = &view.summaries[0];
        assert_eq!(btc.observations, 48);
        assert_eq!(btc.carry.points[0].timestamp.date_naive(), date(1));
        assert_eq!(btc.points.last().unwrap().timestamp.date_naive(), date(2));
    }

    #[test]
    fn no_dates_defers_to_default_window() {
        let args = Args::parse_from(["funding-report"]);
        assert_eq!(history_query(&args).window, None);
        assert_eq!(args.store, StoreKind::Csv);
        assert_eq!(args.rows, 10);

        let args = Args::parse_from(["funding-report", "--store", "sqlite", "--rows", "3"]);
        assert_eq!(args.store, StoreKind::Sqlite);
        assert_eq!(args.rows, 3);
    }

    #[test]
    fn point_rows_show_the_latest_hours() {
        let query = HistoryQuery {
            symbols: Some(vec!["BTC".into()]),
            ..HistoryQuery::default()
        };
        let config = AnalysisConfig {
            default_window_start: None,
            ..AnalysisConfig::default()
        };
        let view = HistoryView::build(&four_days(), &query, &config);
        let rows = point_rows(&view.summaries[0], 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].timestamp, "2025-01-04 23:00:00");
        assert_eq!(rows[1].apr, "87.60%");
        assert_eq!(rows[1].premium, "n/a");
    }
}
