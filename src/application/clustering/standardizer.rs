use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::errors::StandardizeError;

/// Column std at or below this (relative to the column mean) counts as constant.
const ZERO_VARIANCE_EPS: f64 = 1e-12;

/// Per-column z-score scaler, fitted once and reused.
///
/// Uses the population standard deviation. The fitted statistics are kept so
/// scaled values (cluster centroids in particular) can be mapped back to raw
/// feature units with [`Standardizer::inverse_transform`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub columns: Vec<String>,
    pub means: Array1<f64>,
    pub stds: Array1<f64>,
}

impl Standardizer {
    /// Fits column means and standard deviations.
    ///
    /// Fails on an empty matrix, on any non-finite input and on constant
    /// columns, which would otherwise scale to NaN.
    pub fn fit(x: &Array2<f64>, columns: &[&str]) -> Result<Self, StandardizeError> {
        if x.nrows() == 0 {
            return Err(StandardizeError::EmptyMatrix);
        }
        if x.ncols() != columns.len() {
            return Err(StandardizeError::ShapeMismatch {
                expected: columns.len(),
                found: x.ncols(),
            });
        }
        if let Some(((row, col), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(StandardizeError::NonFiniteValue {
                column: columns[col].to_string(),
                row,
            });
        }

        let means = x.mean_axis(Axis(0)).ok_or(StandardizeError::EmptyMatrix)?;
        let stds = x.std_axis(Axis(0), 0.0);

        let constant: Vec<String> = stds
            .iter()
            .zip(means.iter())
            .zip(columns)
            .filter(|((std, mean), _)| **std <= ZERO_VARIANCE_EPS * mean.abs().max(1.0))
            .map(|(_, name)| name.to_string())
            .collect();
        if !constant.is_empty() {
            return Err(StandardizeError::ZeroVariance { columns: constant });
        }

        Ok(Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            means,
            stds,
        })
    }

    /// `(x - mean) / std` per column.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, StandardizeError> {
        self.check_width(x)?;
        Ok((x - &self.means) / &self.stds)
    }

    /// `x * std + mean` per column.
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, StandardizeError> {
        self.check_width(x)?;
        Ok(x * &self.stds + &self.means)
    }

    pub fn fit_transform(
        x: &Array2<f64>,
        columns: &[&str],
    ) -> Result<(Self, Array2<f64>), StandardizeError> {
        let scaler = Self::fit(x, columns)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<(), StandardizeError> {
        if x.ncols() != self.means.len() {
            return Err(StandardizeError::ShapeMismatch {
                expected: self.means.len(),
                found: x.ncols(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const COLUMNS: &[&str] = &["a", "b"];

    #[test]
    fn test_scaled_columns_have_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let (_, scaled) = Standardizer::fit_transform(&x, COLUMNS).unwrap();

        for col in scaled.axis_iter(Axis(1)) {
            let mean = col.mean().unwrap();
            let std = col.std(0.0);
            assert!(mean.abs() < 1e-12);
            assert!((std - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_round_trip_recovers_input() {
        let x = array![[0.5, -3.0], [1.5, 7.25], [9.0, 0.0]];
        let (scaler, scaled) = Standardizer::fit_transform(&x, COLUMNS).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();

        for (a, b) in x.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_variance_column_reported() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let err = Standardizer::fit(&x, COLUMNS).unwrap_err();
        match err {
            StandardizeError::ZeroVariance { columns } => assert_eq!(columns, vec!["b"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let x = array![[1.0, 5.0], [f64::NAN, 6.0]];
        let err = Standardizer::fit(&x, COLUMNS).unwrap_err();
        assert!(matches!(err, StandardizeError::NonFiniteValue { row: 1, .. }));
    }

    #[test]
    fn test_reuses_fitted_statistics() {
        let x = array![[0.0, 0.0], [2.0, 4.0]];
        let scaler = Standardizer::fit(&x, COLUMNS).unwrap();
        let other = scaler.transform(&array![[1.0, 2.0]]).unwrap();
        assert_eq!(other, array![[0.0, 0.0]]);
    }

    #[test]
    fn test_width_mismatch() {
        let x = array![[0.0, 0.0], [2.0, 4.0]];
        let scaler = Standardizer::fit(&x, COLUMNS).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }
}
