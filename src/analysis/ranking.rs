use std::cmp::Ordering;
use std::fmt;

use crate::analysis::transforms::{mean_annualized, volatility};
use crate::models::SymbolSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSymbol {
    pub symbol: String,
    pub mean_annualized: f64,
}

/// Descending by value, ties by symbol ascending.
fn by_value_desc_then_symbol(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Mean annualized rate per symbol over whatever window the series were cut to.
/// Empty series are left out.
pub fn rank_by_mean_annualized(series: &[SymbolSeries]) -> Vec<RankedSymbol> {
    let mut ranked: Vec<RankedSymbol> = series
        .iter()
        .filter_map(|s| {
            mean_annualized(&s.rates()).map(|mean_annualized| RankedSymbol {
                symbol: s.symbol.clone(),
                mean_annualized,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        by_value_desc_then_symbol(
            (&a.symbol, a.mean_annualized),
            (&b.symbol, b.mean_annualized),
        )
    });
    ranked
}

/// What the ranking table shows: everything, or the two ends when the list is long.
#[derive(Debug, Clone, PartialEq)]
pub enum RankingDisplay {
    All(Vec<RankedSymbol>),
    Tails {
        top: Vec<RankedSymbol>,
        bottom: Vec<RankedSymbol>,
        total: usize,
    },
}

/// Splits into top/bottom `tail` only when there are more than `2 * tail` symbols.
pub fn ranking_display(ranked: Vec<RankedSymbol>, tail: usize) -> RankingDisplay {
    if ranked.len() <= tail * 2 {
        return RankingDisplay::All(ranked);
    }
    let total = ranked.len();
    let bottom = ranked[total - tail..].to_vec();
    let mut top = ranked;
    top.truncate(tail);
    RankingDisplay::Tails { top, bottom, total }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityTier {
    High,
    Mid,
    Low,
}

impl fmt::Display for VolatilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VolatilityTier::High => "High",
            VolatilityTier::Mid => "Mid",
            VolatilityTier::Low => "Low",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityRank {
    pub symbol: String,
    pub volatility: f64,
    pub tier: VolatilityTier,
}

/// Full-history volatility, most volatile first. The first `tier_size` are High,
/// the last `tier_size` Low. Symbols without a volatility are left out.
pub fn volatility_ranking(series: &[SymbolSeries], tier_size: usize) -> Vec<VolatilityRank> {
    let mut scored: Vec<(String, f64)> = series
        .iter()
        .filter_map(|s| volatility(&s.rates()).map(|v| (s.symbol.clone(), v)))
        .collect();
    scored.sort_by(|a, b| by_value_desc_then_symbol((&a.0, a.1), (&b.0, b.1)));

    let n = scored.len();
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (symbol, volatility))| {
            let tier = if i < tier_size {
                VolatilityTier::High
            } else if i >= n.saturating_sub(tier_size) {
                VolatilityTier::Low
            } else {
                VolatilityTier::Mid
            };
            VolatilityRank {
                symbol,
                volatility,
                tier,
            }
        })
        .collect()
}
