use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::features::FeatureRecord;
use crate::domain::run_log::InfeasibleCandidate;

/// Outcome of evaluating every candidate cluster count.
#[derive(Debug, Clone)]
pub struct ClusterSelection {
    pub best_k: usize,
    /// Cluster id per matrix row, dense in `[0, best_k)`.
    pub labels: Vec<usize>,
    /// Silhouette score of every feasible candidate.
    pub scores: BTreeMap<usize, f64>,
    pub infeasible: Vec<InfeasibleCandidate>,
    /// Centroids of the winning fit, in scaled feature space.
    pub centroids: Array2<f64>,
    pub inertia: f64,
}

impl ClusterSelection {
    pub fn best_score(&self) -> Option<f64> {
        self.scores.get(&self.best_k).copied()
    }

    /// Row count per cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.best_k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// A feature row with its assigned cluster and 2D projection.
///
/// Rows left out of clustering carry no cluster id and no projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredRecord {
    pub symbol: String,
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
    pub cluster_id: Option<usize>,
    pub pca1: Option<f64>,
    pub pca2: Option<f64>,
}

impl ClusteredRecord {
    pub fn from_record(
        record: &FeatureRecord,
        cluster_id: Option<usize>,
        projection: Option<[f64; 2]>,
    ) -> Self {
        Self {
            symbol: record.symbol.clone(),
            month: record.month.clone(),
            log_return_std: record.log_return_std,
            volatility_15m: record.volatility_15m,
            range_mean: record.range_mean,
            jump_freq: record.jump_freq,
            volume_std: record.volume_std,
            taker_buy_ratio_mean: record.taker_buy_ratio_mean,
            number_of_trades: record.number_of_trades,
            return_skew: record.return_skew,
            return_kurtosis: record.return_kurtosis,
            volume_spike_ratio: record.volume_spike_ratio,
            extreme_flag: record.extreme_flag,
            cluster_id,
            pca1: projection.map(|p| p[0]),
            pca2: projection.map(|p| p[1]),
        }
    }
}
