use statrs::statistics::Statistics;

/// Arithmetic mean. `None` for an empty slice.
#[inline]
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). `None` below two values.
#[inline]
pub fn sample_stddev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let sd = data.iter().std_dev();
    sd.is_finite().then_some(sd)
}

/// Trailing moving average with a minimum of one period: element `i` is the mean
/// of `data[i + 1 - window..=i]`, shortened at the start of the series.
pub fn trailing_mean(data: &[f64], window: usize) -> Vec<f64> {
    if data.is_empty() || window == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(data.len());
    let mut sum = 0.0;
    for (i, &value) in data.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= data[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / count as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn sample_stddev_uses_n_minus_one() {
        // Sample variance of 2,4,4,4,5,5,7,9 is 32/7.
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = sample_stddev(&data).unwrap();
        assert!((sd - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_stddev(&[1.0]), None);
    }

    #[test]
    fn trailing_mean_grows_then_slides() {
        let out = trailing_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        let expected = [1.0, 1.5, 2.0, 3.0, 4.0];
        for (a, b) in out.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!(trailing_mean(&[1.0], 0).is_empty());
    }
}
