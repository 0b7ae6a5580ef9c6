//! Seeded k-means with restarts.
//!
//! k-means++ seeding, Lloyd iterations and a fixed number of restarts drawn
//! from a single `StdRng` stream. The restart with the lowest inertia wins
//! (first one on ties), so a given seed always yields the same labels.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::domain::errors::ClusterError;

/// Fitted partition of a matrix.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Array2<f64>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub restarts: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Convergence threshold on the squared centroid shift, relative to the
    /// mean per-column variance of the data.
    pub tolerance: f64,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            restarts: 20,
            seed,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }

    pub fn fit(&self, x: &Array2<f64>) -> Result<KMeansFit, ClusterError> {
        let n = x.nrows();
        if n < self.k || self.k == 0 {
            return Err(ClusterError::TooFewRows { k: self.k, rows: n });
        }
        let distinct = count_distinct_rows(x, self.k);
        if distinct < self.k {
            return Err(ClusterError::TooFewDistinctPoints {
                k: self.k,
                distinct,
            });
        }

        let abs_tol = self.tolerance * x.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best: Option<KMeansFit> = None;
        for restart in 0..self.restarts.max(1) {
            let centroids = self.init_plus_plus(x, &mut rng);
            let fit = self.lloyd(x, centroids, abs_tol);
            debug!(
                "k={} restart {}: inertia {:.6} after {} iterations",
                self.k, restart, fit.inertia, fit.iterations
            );
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or(ClusterError::TooFewRows { k: self.k, rows: n })
    }

    /// k-means++: first center uniform, then proportional to squared distance.
    fn init_plus_plus(&self, x: &Array2<f64>, rng: &mut StdRng) -> Array2<f64> {
        let n = x.nrows();
        let mut centroids = Array2::zeros((self.k, x.ncols()));
        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&x.row(first));

        let mut closest: Vec<f64> = x
            .outer_iter()
            .map(|row| squared_distance(row, centroids.row(0)))
            .collect();

        for c in 1..self.k {
            let total: f64 = closest.iter().sum();
            let chosen = if total > 0.0 {
                let target = rng.random::<f64>() * total;
                let mut acc = 0.0;
                closest
                    .iter()
                    .position(|d| {
                        acc += d;
                        acc > target
                    })
                    .unwrap_or_else(|| farthest(&closest))
            } else {
                rng.random_range(0..n)
            };
            centroids.row_mut(c).assign(&x.row(chosen));
            for (i, row) in x.outer_iter().enumerate() {
                closest[i] = closest[i].min(squared_distance(row, centroids.row(c)));
            }
        }
        centroids
    }

    fn lloyd(&self, x: &Array2<f64>, mut centroids: Array2<f64>, abs_tol: f64) -> KMeansFit {
        let mut labels = vec![0usize; x.nrows()];
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let distances = assign(x, &centroids, &mut labels);
            let updated = self.update_centroids(x, &labels, &distances);
            let shift: f64 = (&updated - &centroids).mapv(|v| v * v).sum();
            centroids = updated;
            if shift <= abs_tol {
                break;
            }
        }

        // Final assignment against the converged centroids.
        let distances = assign(x, &centroids, &mut labels);
        KMeansFit {
            labels,
            centroids,
            inertia: distances.iter().sum(),
            iterations,
        }
    }

    /// Cluster means; an empty cluster takes the point farthest from its centroid.
    fn update_centroids(&self, x: &Array2<f64>, labels: &[usize], distances: &[f64]) -> Array2<f64> {
        let mut sums = Array2::<f64>::zeros((self.k, x.ncols()));
        let mut counts = vec![0usize; self.k];
        for (row, &label) in x.outer_iter().zip(labels) {
            let mut target = sums.row_mut(label);
            target += &row;
            counts[label] += 1;
        }

        let mut taken = distances.to_vec();
        for (c, &count) in counts.iter().enumerate() {
            if count > 0 {
                let mean = sums.row(c).mapv(|v| v / count as f64);
                sums.row_mut(c).assign(&mean);
            } else {
                let far = farthest(&taken);
                taken[far] = f64::NEG_INFINITY;
                sums.row_mut(c).assign(&x.row(far));
            }
        }
        sums
    }
}

/// Assigns every row to its nearest centroid (lowest index on ties) and
/// returns the squared distances.
fn assign(x: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) -> Vec<f64> {
    x.outer_iter()
        .zip(labels.iter_mut())
        .map(|(row, label)| {
            let (best, dist) = centroids
                .outer_iter()
                .map(|c| squared_distance(row, c))
                .enumerate()
                .fold((0, f64::INFINITY), |acc, (i, d)| if d < acc.1 { (i, d) } else { acc });
            *label = best;
            dist
        })
        .collect()
}

pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn farthest(distances: &[f64]) -> usize {
    distances
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, &d)| if d > acc.1 { (i, d) } else { acc })
        .0
}

/// Number of distinct rows, counting no further than `limit`.
pub fn count_distinct_rows(x: &Array2<f64>, limit: usize) -> usize {
    let mut distinct: Vec<Array1<f64>> = Vec::new();
    for row in x.outer_iter() {
        if !distinct.iter().any(|d| squared_distance(d.view(), row) == 0.0) {
            distinct.push(row.to_owned());
            if distinct.len() >= limit {
                break;
            }
        }
    }
    distinct.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn three_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
            [-10.0, 10.0],
            [-10.1, 10.0],
            [-10.0, 10.1],
        ]
    }

    #[test]
    fn test_recovers_separated_blobs() {
        let fit = KMeans::new(3, 50).fit(&three_blobs()).unwrap();

        for blob in fit.labels.chunks(3) {
            assert!(blob.iter().all(|&l| l == blob[0]));
        }
        let mut ids = fit.labels.clone();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let x = three_blobs();
        let a = KMeans::new(4, 7).fit(&x).unwrap();
        let b = KMeans::new(4, 7).fit(&x).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn test_too_few_rows() {
        let x = array![[0.0], [1.0]];
        let err = KMeans::new(3, 1).fit(&x).unwrap_err();
        assert!(matches!(err, ClusterError::TooFewRows { k: 3, rows: 2 }));
    }

    #[test]
    fn test_too_few_distinct_points() {
        let x = array![[1.0, 1.0], [1.0, 1.0], [2.0, 2.0], [2.0, 2.0]];
        let err = KMeans::new(3, 1).fit(&x).unwrap_err();
        assert!(matches!(err, ClusterError::TooFewDistinctPoints { k: 3, distinct: 2 }));
    }

    #[test]
    fn test_k_equals_rows_gives_singletons() {
        let x = array![[0.0, 0.0], [5.0, 5.0], [9.0, 0.0]];
        let fit = KMeans::new(3, 50).fit(&x).unwrap();
        let mut ids = fit.labels.clone();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(fit.inertia, 0.0);
    }
}
