//! Analysis constants (Immutable Blueprints) and the runtime config built from them

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Hours in a 365-day year. The only annualization constant in the crate.
pub const HOURS_PER_YEAR: f64 = 24.0 * 365.0;

pub struct AnalysisBlueprint {
    /// 30 days of hourly observations
    pub trailing_window: usize,
    /// Minimum share of non-zero rates for a symbol to count as active
    pub activity_threshold: f64,
    pub carry_index_base: f64,
    pub recent_average_days: i64,
    /// Rows kept at each end of the ranking table
    pub ranking_tail: usize,
    /// Symbols tagged High / Low at each end of the volatility ranking
    pub volatility_tier_size: usize,
    pub default_selection_limit: usize,
    pub default_symbols: &'static [&'static str],
    /// (year, month, day) the history dashboard opens on
    pub default_window_start: (i32, u32, u32),
}

pub const ANALYSIS: AnalysisBlueprint = AnalysisBlueprint {
    trailing_window: 720,
    activity_threshold: 0.5,
    carry_index_base: 100.0,
    recent_average_days: 7,
    ranking_tail: 20,
    volatility_tier_size: 15,
    default_selection_limit: 5,
    default_symbols: &["BTC", "ETH", "SOL", "ARB", "DOGE"],
    default_window_start: (2024, 12, 31),
};

/// How the carry index treats missing hours between observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GapPolicy {
    /// Only observed hours compound.
    #[default]
    Skip,
    /// Every missing hour becomes a 0-rate point.
    ZeroFill,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub trailing_window: usize,
    pub activity_threshold: f64,
    pub carry_index_base: f64,
    pub gap_policy: GapPolicy,
    pub recent_average_days: i64,
    pub ranking_tail: usize,
    pub volatility_tier_size: usize,
    pub default_selection_limit: usize,
    pub default_symbols: Vec<String>,
    pub default_window_start: Option<NaiveDate>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let (y, m, d) = ANALYSIS.default_window_start;
        Self {
            trailing_window: ANALYSIS.trailing_window,
            activity_threshold: ANALYSIS.activity_threshold,
            carry_index_base: ANALYSIS.carry_index_base,
            gap_policy: GapPolicy::default(),
            recent_average_days: ANALYSIS.recent_average_days,
            ranking_tail: ANALYSIS.ranking_tail,
            volatility_tier_size: ANALYSIS.volatility_tier_size,
            default_selection_limit: ANALYSIS.default_selection_limit,
            default_symbols: ANALYSIS
                .default_symbols
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_window_start: NaiveDate::from_ymd_opt(y, m, d),
        }
    }
}
