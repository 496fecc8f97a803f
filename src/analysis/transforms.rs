//! Pure per-series transforms. Inputs are hourly fractions, outputs are annualized percent
//! unless the name says otherwise.

use crate::config::HOURS_PER_YEAR;
use crate::utils::{mean, sample_stddev, trailing_mean};

/// Hourly fraction to annualized percent.
#[inline]
pub fn annualize(hourly_rate: f64) -> f64 {
    hourly_rate * HOURS_PER_YEAR * 100.0
}

pub fn annualize_all(rates: &[f64]) -> Vec<f64> {
    rates.iter().copied().map(annualize).collect()
}

/// Trailing mean over `window` observations (minimum one period), annualized.
pub fn trailing_average_annualized(rates: &[f64], window: usize) -> Vec<f64> {
    annualize_all(&trailing_mean(rates, window))
}

pub fn mean_annualized(rates: &[f64]) -> Option<f64> {
    mean(rates).map(annualize)
}

/// Sample standard deviation of the annualized rates.
pub fn volatility(rates: &[f64]) -> Option<f64> {
    sample_stddev(&annualize_all(rates))
}

/// Share of observations with a non-zero rate. `None` for an empty series.
pub fn nonzero_fraction(rates: &[f64]) -> Option<f64> {
    if rates.is_empty() {
        return None;
    }
    let nonzero = rates.iter().filter(|r| **r != 0.0).count();
    Some(nonzero as f64 / rates.len() as f64)
}

/// Inclusive at the threshold; an empty series is never active.
pub fn is_active(rates: &[f64], threshold: f64) -> bool {
    nonzero_fraction(rates).is_some_and(|f| f >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annualize_is_rate_times_8760_times_100() {
        assert_eq!(annualize(0.0001), 0.0001 * 8760.0 * 100.0);
        assert!((annualize(0.0001) - 87.6).abs() < 1e-9);
        assert_eq!(annualize(0.0), 0.0);
        assert!(annualize(-0.00002) < 0.0);
    }

    #[test]
    fn trailing_average_emits_from_first_observation() {
        let rates = [0.0001, 0.0003, 0.0002];
        let avg = trailing_average_annualized(&rates, 2);
        assert_eq!(avg.len(), 3);
        assert!((avg[0] - annualize(0.0001)).abs() < 1e-9);
        assert!((avg[1] - annualize(0.0002)).abs() < 1e-9);
        assert!((avg[2] - annualize(0.00025)).abs() < 1e-9);
    }

    #[test]
    fn volatility_needs_two_points() {
        assert_eq!(volatility(&[]), None);
        assert_eq!(volatility(&[0.0001]), None);
        assert_eq!(volatility(&[0.0001, 0.0001]), Some(0.0));
        let v = volatility(&[0.0, 0.0002]).unwrap();
        // Annualized values 0 and 175.2, sample sd = 175.2 / sqrt(2).
        assert!((v - 175.2 / 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn activity_boundary_is_inclusive_at_half() {
        let series = |nonzero: usize| -> Vec<f64> {
            (0..100).map(|i| if i < nonzero { 0.0001 } else { 0.0 }).collect()
        };
        assert!(is_active(&series(50), 0.5));
        assert!(!is_active(&series(49), 0.5));
        assert!(!is_active(&[], 0.5));
        assert_eq!(nonzero_fraction(&series(100)), Some(1.0));
    }
}
