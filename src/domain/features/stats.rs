//! Descriptive statistics used by the monthly feature extractor.
//!
//! Conventions follow the usual dataframe tooling so that feature values are
//! comparable with notebooks built on the same archive:
//! - standard deviations are sample estimates (n - 1)
//! - skewness is the adjusted Fisher-Pearson coefficient (G1)
//! - kurtosis is the bias-corrected excess kurtosis (G2)
//! - rolling windows require a full window; earlier positions are `None`

use statrs::statistics::Statistics;

/// Moment sums below this magnitude are treated as exact zeros.
const FP_ZERO: f64 = 1e-14;

fn zero_out_fperr(x: f64) -> f64 {
    if x.abs() < FP_ZERO { 0.0 } else { x }
}

/// Sample standard deviation, NaN with fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    values.iter().std_dev()
}

/// Mean of the finite values only, NaN when none are finite.
pub fn finite_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Sample std over each trailing window of `window` values.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

/// Arithmetic mean over each trailing window of `window` values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().mean())
}

fn rolling<F>(values: &[f64], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = vec![None; values.len().min(window - 1)];
    out.extend(values.windows(window).map(|w| Some(stat(w))));
    out
}

fn central_moment_sums(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mean;
        let d2 = d * d;
        (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
    })
}

/// Adjusted Fisher-Pearson skewness. NaN below 3 values, 0 for a flat series.
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let (m2, m3, _) = central_moment_sums(values);
    let m2 = zero_out_fperr(m2);
    let m3 = zero_out_fperr(m3);
    if m2 == 0.0 {
        return 0.0;
    }
    (n * (n - 1.0).sqrt() / (n - 2.0)) * (m3 / m2.powf(1.5))
}

/// Bias-corrected excess kurtosis. NaN below 4 values, 0 for a flat series.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let (m2, _, m4) = central_moment_sums(values);
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    let numerator = zero_out_fperr(n * (n + 1.0) * (n - 1.0) * m4);
    let denominator = zero_out_fperr((n - 2.0) * (n - 3.0) * m2 * m2);
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator - adj
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population std is 2.0, sample std is sqrt(32/7)
        assert!((sample_std(&values) - (32.0f64 / 7.0).sqrt()).abs() < EPS);
        assert!(sample_std(&[1.0]).is_nan());
    }

    #[test]
    fn test_finite_mean_skips_nan_and_inf() {
        let mean = finite_mean([1.0, f64::NAN, 3.0, f64::INFINITY]);
        assert!((mean - 2.0).abs() < EPS);
        assert!(finite_mean([f64::NAN]).is_nan());
    }

    #[test]
    fn test_rolling_window_underfill_is_none() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let means = rolling_mean(&values, 3);
        assert_eq!(means.len(), 5);
        assert_eq!(means[0], None);
        assert_eq!(means[1], None);
        assert_eq!(means[2], Some(2.0));
        assert_eq!(means[4], Some(4.0));

        let stds = rolling_std(&values, 3);
        assert!((stds[2].unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_rolling_window_longer_than_series() {
        let out = rolling_std(&[1.0, 2.0], 15);
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn test_skewness_sign() {
        assert!(skewness(&[1.0, 1.0, 1.0, 1.0, 10.0]) > 0.0);
        assert!(skewness(&[1.0, 10.0, 10.0, 10.0, 10.0]) < 0.0);
        assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).abs() < EPS);
    }

    #[test]
    fn test_skewness_known_value() {
        // deviations about mean 4 are -3, -2, -1, 6: m2 = 50, m3 = 180
        let values = [1.0, 2.0, 3.0, 10.0];
        let n: f64 = 4.0;
        let expected = (n * (n - 1.0).sqrt() / (n - 2.0)) * (180.0 / 50.0f64.powf(1.5));
        assert!((skewness(&values) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_kurtosis_of_flat_and_short_series() {
        assert_eq!(excess_kurtosis(&[0.0; 50]), 0.0);
        assert_eq!(skewness(&[0.0; 50]), 0.0);
        assert!(excess_kurtosis(&[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_kurtosis_single_outlier_is_large() {
        let mut values = vec![0.0; 499];
        values[250] = 0.05;
        assert!(excess_kurtosis(&values) > 100.0);
        assert!(skewness(&values) > 1.5);
    }

    #[test]
    fn test_kurtosis_uniform_is_negative() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        // excess kurtosis of a discrete uniform is about -1.2
        assert!((excess_kurtosis(&values) + 1.2).abs() < 0.05);
    }
}
