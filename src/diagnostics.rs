// Numerical health checks for a finished analysis.

use ndarray::{Array2, ArrayView2};

/// Computes the Frobenius norm of a matrix.
pub fn frobenius_norm(matrix: &ArrayView2<f64>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    matrix.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Computes orthogonality error ||I - VᵗV||_F for a matrix whose columns
/// should be orthonormal.
pub fn orthogonality_error(v_matrix: &ArrayView2<f64>) -> Option<f64> {
    if v_matrix.nrows() == 0 || v_matrix.ncols() == 0 {
        return None;
    }
    let vtv = v_matrix.t().dot(v_matrix);
    let identity = Array2::<f64>::eye(vtv.nrows());
    let diff = identity - vtv;
    Some(frobenius_norm(&diff.view()))
}

/// Computes relative reconstruction error ||A - Â||_F / ||A||_F.
///
/// A zero original reconstructed exactly gives 0; a zero original
/// reconstructed as anything else gives infinity.
pub fn reconstruction_error(original: &ArrayView2<f64>, reconstructed: &ArrayView2<f64>) -> Option<f64> {
    if original.is_empty() || original.dim() != reconstructed.dim() {
        return None;
    }
    let diff = original - reconstructed;
    let norm_diff = frobenius_norm(&diff.view());
    let norm_original = frobenius_norm(original);

    if norm_original < 1e-12 {
        if norm_diff < 1e-12 {
            Some(0.0)
        } else {
            Some(f64::INFINITY)
        }
    } else {
        Some(norm_diff / norm_original)
    }
}
