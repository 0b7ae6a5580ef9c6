//! Silhouette coefficient over Euclidean distances.
//!
//! For a point with mean intra-cluster distance `a` and lowest mean distance
//! to another cluster `b`, `s = (b - a) / max(a, b)`. Points alone in their
//! cluster score 0, so a partition made only of singletons scores 0.

use ndarray::Array2;
use rayon::prelude::*;

use crate::application::clustering::kmeans::squared_distance;

/// Per-point silhouette values. `k` is the number of cluster ids in `labels`.
pub fn silhouette_samples(x: &Array2<f64>, labels: &[usize], k: usize) -> Vec<f64> {
    let mut sizes = vec![0usize; k];
    for &label in labels {
        sizes[label] += 1;
    }

    (0..x.nrows())
        .into_par_iter()
        .map(|i| {
            let own = labels[i];
            if sizes[own] <= 1 {
                return 0.0;
            }

            let mut sums = vec![0.0; k];
            let row = x.row(i);
            for (j, other) in x.outer_iter().enumerate() {
                if j != i {
                    sums[labels[j]] += squared_distance(row, other).sqrt();
                }
            }

            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            if !b.is_finite() {
                return 0.0;
            }

            let denom = a.max(b);
            if denom > 0.0 { (b - a) / denom } else { 0.0 }
        })
        .collect()
}

/// Mean silhouette over all points.
pub fn silhouette_score(x: &Array2<f64>, labels: &[usize], k: usize) -> f64 {
    let samples = silhouette_samples(x, labels, k);
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}
