//! Two-component PCA of the scaled feature matrix, for plotting.

use anyhow::{Result, anyhow, bail};
use ndarray::Array2;
use smartcore::decomposition::pca::{PCA, PCAParameters};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

pub const PROJECTION_COMPONENTS: usize = 2;

/// Projects every row onto the first two principal components.
///
/// Returns one `[pca1, pca2]` pair per input row, in row order. The sign of
/// each component is whatever the decomposition yields.
pub fn project(x: &Array2<f64>) -> Result<Vec<[f64; 2]>> {
    if x.nrows() < 2 || x.ncols() < PROJECTION_COMPONENTS {
        bail!(
            "PCA needs at least 2 rows and {} columns, got {}x{}",
            PROJECTION_COMPONENTS,
            x.nrows(),
            x.ncols()
        );
    }

    let rows: Vec<Vec<f64>> = x.outer_iter().map(|row| row.to_vec()).collect();
    let matrix =
        DenseMatrix::from_2d_vec(&rows).map_err(|e| anyhow!("Matrix error: {}", e))?;

    let pca = PCA::fit(
        &matrix,
        PCAParameters::default().with_n_components(PROJECTION_COMPONENTS),
    )
    .map_err(|e| anyhow!("PCA fit failed: {}", e))?;
    let projected = pca
        .transform(&matrix)
        .map_err(|e| anyhow!("PCA transform failed: {}", e))?;

    Ok((0..x.nrows())
        .map(|i| [*projected.get((i, 0)), *projected.get((i, 1))])
        .collect())
}
