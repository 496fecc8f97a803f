use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::FundingObservation;

// ============================================================================
// SymbolSeries: time-ordered funding history for a single symbol
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSeries {
    pub symbol: String,
    /// Strictly ascending by timestamp, one entry per timestamp.
    observations: Vec<FundingObservation>,
}

impl SymbolSeries {
    /// Sorts by time and keeps the first observation for any repeated timestamp.
    pub fn new(symbol: impl Into<String>, mut observations: Vec<FundingObservation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        observations.dedup_by_key(|o| o.timestamp);
        Self {
            symbol: symbol.into(),
            observations,
        }
    }

    pub fn observations(&self) -> &[FundingObservation] {
        &self.observations
    }

    pub fn rates(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.hourly_rate).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.observations.first().map(|o| o.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.observations.last().map(|o| o.timestamp)
    }

    /// Sub-series inside `window`.
    pub fn within(&self, window: &DateWindow) -> SymbolSeries {
        Self {
            symbol: self.symbol.clone(),
            observations: self
                .observations
                .iter()
                .filter(|o| window.contains(o.timestamp))
                .cloned()
                .collect(),
        }
    }
}

/// Groups a store dump into one series per symbol, ordered by symbol name.
pub fn group_into_series(observations: Vec<FundingObservation>) -> Vec<SymbolSeries> {
    observations
        .into_iter()
        .into_group_map_by(|o| o.symbol.clone())
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|(symbol, obs)| SymbolSeries::new(symbol, obs))
        .collect()
}

// ============================================================================
// Carry index points and date windows
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarryIndexPoint {
    pub timestamp: DateTime<Utc>,
    pub index_value: f64,
}

/// Inclusive range of UTC calendar dates; `None` leaves a side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let date = ts.date_naive();
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }

    /// Narrow open or overreaching ends to `[min, max]`, the dates the data covers.
    /// A window that misses the data entirely comes back unchanged and selects nothing.
    pub fn clamped(&self, min: NaiveDate, max: NaiveDate) -> Self {
        let start = self.start.map_or(min, |s| s.max(min));
        let end = self.end.map_or(max, |e| e.min(max));
        if start > end {
            *self
        } else {
            Self::new(Some(start), Some(end))
        }
    }
}
