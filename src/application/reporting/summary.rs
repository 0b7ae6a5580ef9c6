//! Per-cluster profile of the selected partition.
//!
//! Provides formatted console output; the report serializes to JSON.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::application::clustering::standardizer::Standardizer;
use crate::domain::clustering::ClusterSelection;
use crate::domain::errors::StandardizeError;
use crate::domain::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureRecord};

/// Statistics of one cluster, in raw feature units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub rows: usize,
    pub extreme_rows: usize,
    pub distinct_symbols: usize,
    pub feature_means: BTreeMap<String, f64>,
    /// k-means centroid mapped back through the fitted standardizer.
    pub centroid: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub best_k: usize,
    pub best_score: Option<f64>,
    pub silhouette_scores: BTreeMap<usize, f64>,
    pub inertia: f64,
    pub clustered_rows: usize,
    pub excluded_rows: usize,
    pub clusters: Vec<ClusterProfile>,
}

impl ClusterReport {
    /// `records` are the clustered rows, in the order of `selection.labels`.
    pub fn build(
        records: &[&FeatureRecord],
        selection: &ClusterSelection,
        scaler: &Standardizer,
        excluded_rows: usize,
    ) -> Result<Self, StandardizeError> {
        let centroids = scaler.inverse_transform(&selection.centroids)?;

        let mut sums = vec![[0.0; FEATURE_COUNT]; selection.best_k];
        let mut counts = vec![0usize; selection.best_k];
        let mut extremes = vec![0usize; selection.best_k];
        let mut symbols: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); selection.best_k];

        for (record, &label) in records.iter().zip(&selection.labels) {
            for (sum, value) in sums[label].iter_mut().zip(record.numeric_features()) {
                *sum += value;
            }
            counts[label] += 1;
            if record.is_extreme() {
                extremes[label] += 1;
            }
            symbols[label].insert(record.symbol.as_str());
        }

        let clusters = (0..selection.best_k)
            .map(|c| {
                let n = counts[c].max(1) as f64;
                ClusterProfile {
                    cluster_id: c,
                    rows: counts[c],
                    extreme_rows: extremes[c],
                    distinct_symbols: symbols[c].len(),
                    feature_means: named(sums[c].iter().map(|s| s / n)),
                    centroid: named(centroids.row(c).iter().copied()),
                }
            })
            .collect();

        Ok(Self {
            best_k: selection.best_k,
            best_score: selection.best_score(),
            silhouette_scores: selection.scores.clone(),
            inertia: selection.inertia,
            clustered_rows: records.len(),
            excluded_rows,
            clusters,
        })
    }

    /// Prints the candidate scores and one line per cluster.
    pub fn print_table(&self) {
        println!("\n{}", "=".repeat(96));
        println!("MARKET REGIMES - k = {}", self.best_k);
        println!("{}", "=".repeat(96));

        println!("Silhouette scores:");
        for (k, score) in &self.silhouette_scores {
            let marker = if *k == self.best_k { " <- selected" } else { "" };
            println!("  k = {:<3} {:>8.4}{}", k, score, marker);
        }
        println!(
            "Rows clustered: {}, excluded: {}",
            self.clustered_rows, self.excluded_rows
        );

        println!(
            "\n{:<8} | {:>6} | {:>7} | {:>7} | {:>12} | {:>10} | {:>10} | {:>10}",
            "Cluster", "Rows", "Extreme", "Symbols", "LogRetStd", "JumpFreq", "Skew", "Kurtosis"
        );
        println!("{}", "-".repeat(96));
        for cluster in &self.clusters {
            let mean = |name: &str| cluster.feature_means.get(name).copied().unwrap_or(f64::NAN);
            println!(
                "{:<8} | {:>6} | {:>7} | {:>7} | {:>12.6} | {:>10.5} | {:>10.3} | {:>10.2}",
                cluster.cluster_id,
                cluster.rows,
                cluster.extreme_rows,
                cluster.distinct_symbols,
                mean("log_return_std"),
                mean("jump_freq"),
                mean("return_skew"),
                mean("return_kurtosis"),
            );
        }
        println!("{}\n", "=".repeat(96));
    }
}

fn named(values: impl Iterator<Item = f64>) -> BTreeMap<String, f64> {
    FEATURE_NAMES
        .iter()
        .zip(values)
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
