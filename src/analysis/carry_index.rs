//! Compounding carry index: the value of holding the funding-receiving side from the
//! first hour of the window, starting at `base`.

use chrono::{DateTime, Duration, Utc};

use crate::config::GapPolicy;
use crate::models::{CarryIndexPoint, SymbolSeries};

/// `n` rates in, `n + 1` values out: `base`, then one compounded value per rate, in input order.
pub fn compound(base: f64, rates: &[f64]) -> Vec<f64> {
    let mut values = Vec::with_capacity(rates.len() + 1);
    let mut current = base;
    values.push(current);
    for rate in rates {
        current *= 1.0 + rate;
        values.push(current);
    }
    values
}

/// (timestamp, rate) pairs to compound. `ZeroFill` adds a 0-rate hour for every missing hour.
fn compounding_steps(series: &SymbolSeries, policy: GapPolicy) -> Vec<(DateTime<Utc>, f64)> {
    let observed = series
        .observations()
        .iter()
        .map(|o| (o.timestamp, o.hourly_rate));

    match policy {
        GapPolicy::Skip => observed.collect(),
        GapPolicy::ZeroFill => {
            let mut steps: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(series.len());
            for (ts, rate) in observed {
                if let Some(&(prev, _)) = steps.last() {
                    let mut filler = prev + Duration::hours(1);
                    while filler < ts {
                        steps.push((filler, 0.0));
                        filler += Duration::hours(1);
                    }
                }
                steps.push((ts, rate));
            }
            steps
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarryIndex {
    pub symbol: String,
    pub base: f64,
    /// `points[0]` is the base stamped at the first timestamp; each later point is the
    /// index after that hour's rate.
    pub points: Vec<CarryIndexPoint>,
}

impl CarryIndex {
    /// `series` is already time ordered. An empty series yields no points.
    pub fn build(series: &SymbolSeries, base: f64, policy: GapPolicy) -> Self {
        let steps = compounding_steps(series, policy);
        let rates: Vec<f64> = steps.iter().map(|(_, r)| *r).collect();
        let values = compound(base, &rates);

        let points = match steps.first() {
            None => Vec::new(),
            Some(&(first, _)) => std::iter::once(first)
                .chain(steps.iter().map(|(ts, _)| *ts))
                .zip(values)
                .map(|(timestamp, index_value)| CarryIndexPoint {
                    timestamp,
                    index_value,
                })
                .collect(),
        };

        Self {
            symbol: series.symbol.clone(),
            base,
            points,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.index_value).collect()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.index_value)
    }

    pub fn metrics(&self) -> Option<CarryMetrics> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        let final_index = last.index_value;

        // Sub-day windows count as one day.
        let days_in_period = (last.timestamp - first.timestamp).num_days().max(1);
        let growth = final_index / self.base;
        let annualized_return = (growth.powf(365.0 / days_in_period as f64) - 1.0) * 100.0;

        Some(CarryMetrics {
            final_index,
            gross_return: final_index - self.base,
            annualized_return,
            days_in_period,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarryMetrics {
    pub final_index: f64,
    /// Index points gained over the window, i.e. percent when the base is 100.
    pub gross_return: f64,
    pub annualized_return: f64,
    pub days_in_period: i64,
}
