//! Monthly feature extraction.
//!
//! Turns one calendar month of minute bars into a [`FeatureRecord`]:
//!
//! - `log_return_std`: std of log returns (volatility magnitude)
//! - `volatility_15m`: mean of the rolling std of log returns
//! - `range_mean`: mean relative bar range, (high - low) / close
//! - `jump_freq`: share of returns beyond `k` sigma of the same month
//! - `volume_std`: ln(1 + std of volume)
//! - `taker_buy_ratio_mean`: mean taker-buy share, zero-volume bars skipped
//! - `number_of_trades`: mean trades per bar
//! - `return_skew` / `return_kurtosis`: shape of the return distribution
//! - `volume_spike_ratio`: share of bars above `m` times the rolling mean volume
//! - `extreme_flag`: strongly one-sided and fat-tailed month
//!
//! Rolling windows only see rows of the sliced month. The first
//! `window - 1` rows have no value: they are left out of the volatility mean
//! and count as "no spike" for the volume ratio.

use tracing::debug;

use crate::config::PipelineConfig;
use crate::domain::features::FeatureRecord;
use crate::domain::features::stats::{
    excess_kurtosis, finite_mean, rolling_mean, rolling_std, sample_std, skewness,
};
use crate::domain::market::series::{Bar, MinuteSeries, YearMonth};

/// Result of extracting one symbol-month.
#[derive(Debug, Clone, PartialEq)]
pub enum MonthlyExtraction {
    Emitted(FeatureRecord),
    /// Fewer bars than the minimum; no record, not an error.
    Insufficient { bars: usize },
}

impl MonthlyExtraction {
    pub fn into_record(self) -> Option<FeatureRecord> {
        match self {
            MonthlyExtraction::Emitted(record) => Some(record),
            MonthlyExtraction::Insufficient { .. } => None,
        }
    }
}

/// Parameters of the feature formulas
#[derive(Debug, Clone)]
pub struct MonthlyFeatureExtractor {
    pub min_bars: usize,
    pub vol_window: usize,
    pub volume_spike_window: usize,
    pub jump_sigma: f64,
    pub volume_spike_multiplier: f64,
    pub extreme_skew: f64,
    pub extreme_kurtosis: f64,
}

impl Default for MonthlyFeatureExtractor {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl MonthlyFeatureExtractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_bars: config.min_bars_per_month,
            vol_window: config.rolling_window_vol,
            volume_spike_window: config.rolling_window_volume_spike,
            jump_sigma: config.jump_sigma_multiplier,
            volume_spike_multiplier: config.volume_spike_multiplier,
            extreme_skew: config.extreme_skew_threshold,
            extreme_kurtosis: config.extreme_kurtosis_threshold,
        }
    }

    /// Extracts the features of `month` from a normalized series.
    pub fn extract(
        &self,
        symbol: &str,
        series: &MinuteSeries,
        month: YearMonth,
    ) -> MonthlyExtraction {
        let slice = series.month_slice(month);
        if slice.len() < self.min_bars {
            return MonthlyExtraction::Insufficient { bars: slice.len() };
        }
        MonthlyExtraction::Emitted(self.compute(symbol, month, slice))
    }

    /// Features of an already-sliced month. The minimum-bars gate is the caller's.
    pub fn compute(&self, symbol: &str, month: YearMonth, slice: &[Bar]) -> FeatureRecord {
        // Returns are taken over the full slice first; a row is then kept only
        // when its return and every field of its bar are finite. The first bar
        // of the slice never has a return.
        let (returns, bars): (Vec<f64>, Vec<&Bar>) = slice
            .windows(2)
            .map(|w| ((w[1].close / w[0].close).ln(), &w[1]))
            .filter(|(r, bar)| r.is_finite() && bar.is_finite())
            .unzip();

        let log_return_std = sample_std(&returns);

        let volatility_15m = finite_mean(
            rolling_std(&returns, self.vol_window)
                .into_iter()
                .flatten(),
        );

        let range_mean = finite_mean(bars.iter().map(|b| (b.high - b.low) / b.close));

        let jump_threshold = self.jump_sigma * log_return_std;
        let jump_freq = share(returns.iter().map(|r| r.abs() > jump_threshold));

        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let volume_std = sample_std(&volumes).ln_1p();

        let taker_buy_ratio_mean = finite_mean(
            bars.iter()
                .map(|b| b.taker_buy_base_asset_volume / b.volume),
        );

        let number_of_trades = finite_mean(bars.iter().map(|b| b.number_of_trades));

        let return_skew = skewness(&returns);
        let return_kurtosis = excess_kurtosis(&returns);

        let volume_spike_ratio = share(
            rolling_mean(&volumes, self.volume_spike_window)
                .iter()
                .zip(&volumes)
                .map(|(avg, v)| matches!(avg, Some(a) if *v > self.volume_spike_multiplier * a)),
        );

        let extreme_flag = self.is_extreme(return_skew, return_kurtosis);

        debug!(
            "{} {}: {} bars, {} returns, std={:.6}, skew={:.3}, kurt={:.3}",
            symbol,
            month,
            slice.len(),
            returns.len(),
            log_return_std,
            return_skew,
            return_kurtosis
        );

        FeatureRecord {
            symbol: symbol.to_string(),
            month: month.to_string(),
            log_return_std,
            volatility_15m,
            range_mean,
            jump_freq,
            volume_std,
            taker_buy_ratio_mean,
            number_of_trades,
            return_skew,
            return_kurtosis,
            volume_spike_ratio,
            extreme_flag: u8::from(extreme_flag),
        }
    }

    /// One-sided, fat-tailed month. NaN moments never qualify.
    pub fn is_extreme(&self, skew: f64, kurtosis: f64) -> bool {
        skew.abs() > self.extreme_skew && kurtosis > self.extreme_kurtosis
    }
}

/// Fraction of `true` values, NaN for an empty input.
fn share<I: IntoIterator<Item = bool>>(flags: I) -> f64 {
    let (hits, total) = flags
        .into_iter()
        .fold((0usize, 0usize), |(h, t), f| (h + usize::from(f), t + 1));
    if total == 0 {
        f64::NAN
    } else {
        hits as f64 / total as f64
    }
}
