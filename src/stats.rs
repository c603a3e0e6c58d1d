// Shared numeric primitives. Variance and covariance use the sample (n-1) denominator.

use crate::error::PcaError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Arithmetic mean of a sequence.
pub fn mean(values: ArrayView1<f64>) -> Result<f64, PcaError> {
    if values.is_empty() {
        return Err(PcaError::InsufficientObservations { found: 0 });
    }
    Ok(values.sum() / values.len() as f64)
}

/// Sample variance (n-1 denominator).
pub fn variance(values: ArrayView1<f64>) -> Result<f64, PcaError> {
    covariance(values, values)
}

/// Sample covariance of two equally long sequences (n-1 denominator).
pub fn covariance(xs: ArrayView1<f64>, ys: ArrayView1<f64>) -> Result<f64, PcaError> {
    if xs.len() != ys.len() {
        return Err(PcaError::ShapeMismatch {
            what: "covariance operands",
            expected: xs.len(),
            found: ys.len(),
        });
    }
    let n = xs.len();
    if n < 2 {
        return Err(PcaError::InsufficientObservations { found: n });
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let sum: f64 = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| (x - mean_x) * (y - mean_y))
        .sum();
    Ok(sum / (n - 1) as f64)
}

/// Per-column means of an (n_samples, n_features) matrix.
pub fn column_means(matrix: ArrayView2<f64>) -> Result<Array1<f64>, PcaError> {
    matrix
        .mean_axis(Axis(0))
        .ok_or(PcaError::InsufficientObservations { found: 0 })
}

/// Per-column sample standard deviations (n-1 denominator).
pub fn column_std_devs(matrix: ArrayView2<f64>) -> Result<Array1<f64>, PcaError> {
    if matrix.nrows() < 2 {
        return Err(PcaError::InsufficientObservations {
            found: matrix.nrows(),
        });
    }
    Ok(matrix.map_axis(Axis(0), |column| column.std(1.0)))
}

/// Covariance matrix `(XᵗX) / (n-1)` of an already centered matrix.
pub fn covariance_matrix(centered: ArrayView2<f64>) -> Result<Array2<f64>, PcaError> {
    let n_samples = centered.nrows();
    if n_samples < 2 {
        return Err(PcaError::InsufficientObservations { found: n_samples });
    }
    let mut cov = centered.t().dot(&centered);
    cov /= (n_samples - 1) as f64;
    // XᵗX is symmetric in exact arithmetic; make it symmetric in floating point too.
    let p = cov.nrows();
    for i in 0..p {
        for j in (i + 1)..p {
            let avg = 0.5 * (cov[[i, j]] + cov[[j, i]]);
            cov[[i, j]] = avg;
            cov[[j, i]] = avg;
        }
    }
    Ok(cov)
}

/// Matrix product with an explicit shape check.
pub fn matmul(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Array2<f64>, PcaError> {
    if a.ncols() != b.nrows() {
        return Err(PcaError::ShapeMismatch {
            what: "matrix product inner dimension",
            expected: a.ncols(),
            found: b.nrows(),
        });
    }
    Ok(a.dot(&b))
}

pub fn transpose(a: ArrayView2<f64>) -> Array2<f64> {
    a.t().to_owned()
}

pub fn dot(u: ArrayView1<f64>, v: ArrayView1<f64>) -> Result<f64, PcaError> {
    if u.len() != v.len() {
        return Err(PcaError::ShapeMismatch {
            what: "dot product operands",
            expected: u.len(),
            found: v.len(),
        });
    }
    Ok(u.dot(&v))
}

/// Euclidean norm.
pub fn norm(u: ArrayView1<f64>) -> f64 {
    u.dot(&u).sqrt()
}

/// Builds a matrix from row vectors, rejecting ragged input.
pub fn rows_to_matrix(rows: &[Vec<f64>]) -> Result<Array2<f64>, PcaError> {
    let width = rows.first().map_or(0, |row| row.len());
    if let Some(ragged) = rows.iter().find(|row| row.len() != width) {
        return Err(PcaError::ShapeMismatch {
            what: "row length",
            expected: width,
            found: ragged.len(),
        });
    }
    Ok(Array2::from_shape_fn((rows.len(), width), |(i, j)| rows[i][j]))
}
