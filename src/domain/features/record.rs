use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Ordered list of the numeric feature columns fed to clustering.
/// The order is the column order of the feature file and of the scaled matrix.
pub const FEATURE_NAMES: &[&str] = &[
    "log_return_std",
    "volatility_15m",
    "range_mean",
    "jump_freq",
    "volume_std",
    "taker_buy_ratio_mean",
    "number_of_trades",
    "return_skew",
    "return_kurtosis",
    "volume_spike_ratio",
];

pub const FEATURE_COUNT: usize = 10;

/// Monthly statistical fingerprint of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub symbol: String,
    /// `YYYY-MM`
    pub month: String,
    pub log_return_std: f64,
    pub volatility_15m: f64,
    pub range_mean: f64,
    pub jump_freq: f64,
    pub volume_std: f64,
    pub taker_buy_ratio_mean: f64,
    pub number_of_trades: f64,
    pub return_skew: f64,
    pub return_kurtosis: f64,
    pub volume_spike_ratio: f64,
    pub extreme_flag: u8,
}

impl FeatureRecord {
    /// Numeric features in [`FEATURE_NAMES`] order.
    pub fn numeric_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.log_return_std,
            self.volatility_15m,
            self.range_mean,
            self.jump_freq,
            self.volume_std,
            self.taker_buy_ratio_mean,
            self.number_of_trades,
            self.return_skew,
            self.return_kurtosis,
            self.volume_spike_ratio,
        ]
    }

    /// Names of the numeric features that are NaN or infinite.
    pub fn non_finite_features(&self) -> Vec<&'static str> {
        self.numeric_features()
            .iter()
            .zip(FEATURE_NAMES)
            .filter(|(v, _)| !v.is_finite())
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn is_extreme(&self) -> bool {
        self.extreme_flag == 1
    }
}

/// All valid symbol-months of a run, in extraction order.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn from_records(records: Vec<FeatureRecord>) -> Self {
        Self { records }
    }

    pub fn extend<I: IntoIterator<Item = FeatureRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Splits row indices into (all features finite, at least one non-finite).
    pub fn partition_finite(&self) -> (Vec<usize>, Vec<usize>) {
        (0..self.records.len()).partition(|&i| self.records[i].non_finite_features().is_empty())
    }

    /// Numeric feature matrix of the given rows (rows x FEATURE_COUNT).
    pub fn feature_matrix(&self, rows: &[usize]) -> Array2<f64> {
        Array2::from_shape_fn((rows.len(), FEATURE_COUNT), |(i, j)| {
            self.records[rows[i]].numeric_features()[j]
        })
    }
}
