//! Dashboard view models. Everything here is rebuilt from the store on each
//! load or filter change and handed to the report read-only.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use itertools::Itertools;
use rayon::prelude::*;

use crate::analysis::carry_index::{CarryIndex, CarryMetrics, compound};
use crate::analysis::ranking::{
    RankingDisplay, VolatilityRank, rank_by_mean_annualized, ranking_display, volatility_ranking,
};
use crate::analysis::transforms::{
    annualize, is_active, mean_annualized, trailing_average_annualized, volatility,
};
use crate::config::AnalysisConfig;
use crate::data::storage::RecordStore;
use crate::domain::{FundingObservation, SnapshotRow};
use crate::models::{DateWindow, SymbolSeries, group_into_series};

/// What the user picked. `symbols: None` means the default selection.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub symbols: Option<Vec<String>>,
    pub window: Option<DateWindow>,
    pub include_inactive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub symbol: String,
    pub observations: usize,
    pub latest_annualized: Option<f64>,
    pub mean_annualized: Option<f64>,
    pub recent_average: Option<f64>,
    pub volatility: Option<f64>,
    pub carry: CarryIndex,
    pub metrics: Option<CarryMetrics>,
    /// One entry per observation in the window, time ordered.
    pub points: Vec<SeriesPoint>,
}

impl SymbolSummary {
    /// The last `n` points, oldest first.
    pub fn tail(&self, n: usize) -> &[SeriesPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }
}

/// One hour of a symbol's chart data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub annualized: f64,
    pub trailing_average: f64,
    /// Carry index after this hour's rate.
    pub carry_index: f64,
    pub premium_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCell {
    pub symbol: String,
    pub date: NaiveDate,
    pub mean_annualized: f64,
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    /// Symbols the picker offers, i.e. active ones unless inactive are included.
    pub available: Vec<String>,
    pub selected: Vec<String>,
    /// Requested window clamped to the data; `None` when there is no data.
    pub window: Option<DateWindow>,
    pub summaries: Vec<SymbolSummary>,
    pub ranking: RankingDisplay,
    pub volatility: Vec<VolatilityRank>,
    pub heatmap: Vec<HeatmapCell>,
}

fn data_date_range(series: &[SymbolSeries]) -> Option<(NaiveDate, NaiveDate)> {
    let min = series.iter().filter_map(|s| s.first_timestamp()).min()?;
    let max = series.iter().filter_map(|s| s.last_timestamp()).max()?;
    Some((min.date_naive(), max.date_naive()))
}

/// Configured defaults that exist, otherwise the first few available symbols.
pub fn default_selection(available: &[String], config: &AnalysisConfig) -> Vec<String> {
    let defaults: Vec<String> = config
        .default_symbols
        .iter()
        .filter(|s| available.contains(s))
        .cloned()
        .collect();
    if !defaults.is_empty() {
        return defaults;
    }
    available
        .iter()
        .take(config.default_selection_limit)
        .cloned()
        .collect()
}

fn resolve_selection(
    requested: Option<&[String]>,
    available: &[String],
    config: &AnalysisConfig,
) -> Vec<String> {
    let Some(requested) = requested else {
        return default_selection(available, config);
    };
    let known: HashSet<&str> = available.iter().map(String::as_str).collect();
    requested
        .iter()
        .filter(|s| {
            let ok = known.contains(s.as_str());
            if !ok {
                log::warn!("⚠ {} is not available (unknown or inactive); skipped", s);
            }
            ok
        })
        .cloned()
        .unique()
        .collect()
}

/// Mean annualized rate over the trailing `days` of `series`, measured back from its
/// latest timestamp. The cutoff itself is included.
pub fn recent_average(series: &SymbolSeries, days: i64) -> Option<f64> {
    let latest = series.last_timestamp()?;
    let cutoff = latest - Duration::days(days);
    let recent: Vec<f64> = series
        .observations()
        .iter()
        .filter(|o| o.timestamp >= cutoff)
        .map(|o| o.hourly_rate)
        .collect();
    mean_annualized(&recent)
}

fn summarize(windowed: &SymbolSeries, config: &AnalysisConfig) -> SymbolSummary {
    let rates = windowed.rates();
    let carry = CarryIndex::build(windowed, config.carry_index_base, config.gap_policy);
    let metrics = carry.metrics();

    // Filler hours compound by 1.0, so per-observation values match either gap policy.
    let index_values = compound(config.carry_index_base, &rates);
    let trailing = trailing_average_annualized(&rates, config.trailing_window);
    let points = windowed
        .observations()
        .iter()
        .zip(trailing)
        .zip(index_values.into_iter().skip(1))
        .map(|((o, trailing_average), carry_index)| SeriesPoint {
            timestamp: o.timestamp,
            annualized: annualize(o.hourly_rate),
            trailing_average,
            carry_index,
            premium_pct: o.premium.map(|p| p * 100.0),
        })
        .collect();

    SymbolSummary {
        symbol: windowed.symbol.clone(),
        observations: windowed.len(),
        latest_annualized: rates.last().copied().map(annualize),
        mean_annualized: mean_annualized(&rates),
        recent_average: recent_average(windowed, config.recent_average_days),
        volatility: volatility(&rates),
        points,
        carry,
        metrics,
    }
}

/// Mean annualized rate per (symbol, UTC date).
pub fn daily_heatmap(series: &[SymbolSeries]) -> Vec<HeatmapCell> {
    series
        .iter()
        .flat_map(|s| {
            s.observations()
                .iter()
                .into_group_map_by(|o| o.timestamp.date_naive())
                .into_iter()
                .sorted_by_key(|(date, _)| *date)
                .map(|(date, day)| {
                    let sum: f64 = day.iter().map(|o| o.hourly_rate).sum();
                    HeatmapCell {
                        symbol: s.symbol.clone(),
                        date,
                        mean_annualized: annualize(sum / day.len() as f64),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

impl HistoryView {
    pub fn build(
        all_series: &[SymbolSeries],
        query: &HistoryQuery,
        config: &AnalysisConfig,
    ) -> Self {
        // 1. Activity is judged on the full history, never the window
        let candidates: Vec<&SymbolSeries> = all_series
            .iter()
            .filter(|s| query.include_inactive || is_active(&s.rates(), config.activity_threshold))
            .collect();
        let available: Vec<String> = candidates.iter().map(|s| s.symbol.clone()).collect();

        // 2. Selection and window
        let selected = resolve_selection(query.symbols.as_deref(), &available, config);
        let requested_window = query
            .window
            .unwrap_or_else(|| DateWindow::new(config.default_window_start, None));
        let window = data_date_range(all_series).map(|(min, max)| requested_window.clamped(min, max));
        let effective = window.unwrap_or(requested_window);

        let windowed: Vec<SymbolSeries> = candidates.iter().map(|s| s.within(&effective)).collect();

        // 3. Per-symbol summaries for the selection
        let chosen: Vec<&SymbolSeries> = selected
            .iter()
            .filter_map(|sym| windowed.iter().find(|s| &s.symbol == sym))
            .collect();
        let summaries: Vec<SymbolSummary> = chosen
            .par_iter()
            .map(|s| summarize(s, config))
            .collect();

        // 4. Cross-symbol tables
        let ranking = ranking_display(rank_by_mean_annualized(&windowed), config.ranking_tail);
        let full: Vec<SymbolSeries> = candidates.into_iter().cloned().collect();
        let volatility = volatility_ranking(&full, config.volatility_tier_size);
        let chosen_owned: Vec<SymbolSeries> = chosen.into_iter().cloned().collect();
        let heatmap = daily_heatmap(&chosen_owned);

        log::debug!(
            "History view: {} available, {} selected, window {:?}",
            available.len(),
            selected.len(),
            window
        );

        Self {
            available,
            selected,
            window,
            summaries,
            ranking,
            volatility,
            heatmap,
        }
    }
}

/// Everything in the store, grouped per symbol.
pub async fn load_history_series<S>(store: &S) -> Result<Vec<SymbolSeries>>
where
    S: RecordStore<FundingObservation> + ?Sized,
{
    let rows = store
        .load_all()
        .await
        .context("Failed to load funding history")?;
    log::info!("Loaded {} funding history rows", rows.len());
    Ok(group_into_series(rows))
}

// ============================================================================
// Snapshot dashboard
// ============================================================================

#[derive(Debug, Clone)]
pub struct SnapshotView {
    pub latest_poll: Option<DateTime<Utc>>,
    /// Latest poll, highest annualized funding first.
    pub latest: Vec<SnapshotRow>,
    pub symbols: Vec<String>,
    /// Rows of the trailing window, time ordered.
    pub recent: Vec<SnapshotRow>,
}

/// Rows sharing the maximum poll timestamp.
pub fn latest_snapshot(rows: &[SnapshotRow]) -> Vec<SnapshotRow> {
    let Some(latest) = rows.iter().map(|r| r.timestamp).max() else {
        return Vec::new();
    };
    rows.iter()
        .filter(|r| r.timestamp == latest)
        .cloned()
        .sorted_by(|a, b| {
            b.funding_rate
                .total_cmp(&a.funding_rate)
                .then_with(|| a.symbol.cmp(&b.symbol))
        })
        .collect()
}

pub fn snapshot_symbols(rows: &[SnapshotRow]) -> Vec<String> {
    rows.iter()
        .map(|r| r.symbol.clone())
        .unique()
        .sorted()
        .collect()
}

/// Rows no older than `days` before `now`.
pub fn snapshots_since(rows: &[SnapshotRow], days: i64, now: DateTime<Utc>) -> Vec<SnapshotRow> {
    let cutoff = now - Duration::days(days);
    rows.iter()
        .filter(|r| r.timestamp >= cutoff)
        .cloned()
        .sorted_by_key(|r| r.timestamp)
        .collect()
}

impl SnapshotView {
    pub fn build(rows: &[SnapshotRow], days: i64, now: DateTime<Utc>) -> Self {
        let latest = latest_snapshot(rows);
        Self {
            latest_poll: latest.first().map(|r| r.timestamp),
            latest,
            symbols: snapshot_symbols(rows),
            recent: snapshots_since(rows, days, now),
        }
    }
}
