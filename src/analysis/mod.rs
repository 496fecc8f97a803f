// Transform pipeline: pure functions over SymbolSeries, then dashboard views
pub mod carry_index;
pub mod ranking;
pub mod transforms;
pub mod views;

pub use carry_index::{CarryIndex, CarryMetrics, compound};
pub use ranking::{
    RankedSymbol, RankingDisplay, VolatilityRank, VolatilityTier, rank_by_mean_annualized,
    ranking_display, volatility_ranking,
};
pub use transforms::{
    annualize, annualize_all, is_active, mean_annualized, nonzero_fraction,
    trailing_average_annualized, volatility,
};
pub use views::{
    HeatmapCell, HistoryQuery, HistoryView, SeriesPoint, SnapshotView, SymbolSummary,
    load_history_series,
};
