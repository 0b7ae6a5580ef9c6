use ndarray::Array2;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::application::clustering::kmeans::{KMeans, KMeansFit, count_distinct_rows};
use crate::application::clustering::silhouette::silhouette_score;
use crate::config::PipelineConfig;
use crate::domain::clustering::ClusterSelection;
use crate::domain::errors::ClusterError;
use crate::domain::run_log::InfeasibleCandidate;

/// Fits k-means for every candidate k and keeps the best silhouette.
///
/// Each candidate uses its own generator seeded with the same value, so the
/// result does not depend on evaluation order or on `parallel`.
#[derive(Debug, Clone)]
pub struct ClusterSelector {
    pub k_min: usize,
    pub k_max: usize,
    pub restarts: usize,
    pub seed: u64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub parallel: bool,
}

impl ClusterSelector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            k_min: config.k_min,
            k_max: config.k_max,
            restarts: config.random_restarts,
            seed: config.random_seed,
            max_iterations: config.max_iterations,
            tolerance: config.convergence_tolerance,
            parallel: config.parallel,
        }
    }

    pub fn select(&self, x: &Array2<f64>) -> Result<ClusterSelection, ClusterError> {
        if self.k_min > self.k_max {
            return Err(ClusterError::InvalidRange {
                k_min: self.k_min,
                k_max: self.k_max,
            });
        }
        let rows = x.nrows();
        if rows >= 2 && count_distinct_rows(x, 2) < 2 {
            return Err(ClusterError::DegenerateMatrix { rows });
        }

        let candidates: Vec<usize> = (self.k_min..=self.k_max).collect();
        let evaluations: Vec<(usize, Result<(KMeansFit, f64), ClusterError>)> = if self.parallel {
            candidates
                .par_iter()
                .map(|&k| (k, self.evaluate(x, k)))
                .collect()
        } else {
            candidates.iter().map(|&k| (k, self.evaluate(x, k))).collect()
        };

        let mut scores = BTreeMap::new();
        let mut fits = BTreeMap::new();
        let mut infeasible = Vec::new();
        for (k, evaluation) in evaluations {
            match evaluation {
                Ok((fit, score)) => {
                    info!("k = {}, silhouette score = {:.4}", k, score);
                    scores.insert(k, score);
                    fits.insert(k, fit);
                }
                Err(e) => {
                    warn!("k = {} infeasible: {}", k, e);
                    infeasible.push(InfeasibleCandidate {
                        k,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let (best_k, fit) = best_candidate(&scores)
            .and_then(|k| fits.remove(&k).map(|fit| (k, fit)))
            .ok_or(ClusterError::NoFeasibleCandidate {
                k_min: self.k_min,
                k_max: self.k_max,
                rows,
            })?;
        info!(
            "The best number of clusters: k = {}, silhouette = {:.4}",
            best_k, scores[&best_k]
        );

        Ok(ClusterSelection {
            best_k,
            labels: fit.labels,
            scores,
            infeasible,
            centroids: fit.centroids,
            inertia: fit.inertia,
        })
    }

    fn evaluate(&self, x: &Array2<f64>, k: usize) -> Result<(KMeansFit, f64), ClusterError> {
        let model = KMeans {
            k,
            restarts: self.restarts,
            seed: self.seed,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        };
        let fit = model.fit(x)?;
        let score = silhouette_score(x, &fit.labels, k);
        Ok((fit, score))
    }
}

/// Highest score wins; ties go to the smallest k. NaN scores never win.
pub fn best_candidate(scores: &BTreeMap<usize, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (&k, &score) in scores {
        if score.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((k, score));
        }
    }
    best.map(|(k, _)| k)
}
