// src/linalg_backends.rs

use crate::error::PcaError;
use ndarray::{Array1, Array2};
use ndarray_linalg::{Eigh as NdLinalgEigh, SVDInto as NdLinalgSVDInto, UPLO};

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput {
    /// Eigenvalues, in whatever order the solver produced them.
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Trait for symmetric eigendecomposition.
/// Implementers expect `matrix` to be symmetric.
pub trait BackendEigh {
    /// Short name used in logs and in `NumericalDivergence` errors.
    fn name(&self) -> &'static str;

    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, PcaError>;
}

/// Output of a Singular Value Decomposition.
#[derive(Debug)]
pub struct SVDOutput {
    pub u: Option<Array2<f64>>,
    /// Singular values, length min(n, p), in descending order.
    pub s: Array1<f64>,
    /// Full (p, p) right singular vectors, transposed.
    pub vt: Option<Array2<f64>>,
}

/// Trait for Singular Value Decomposition.
pub trait BackendSVD {
    fn name(&self) -> &'static str;

    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput, PcaError>;
}

/// LAPACK routines through `ndarray-linalg`. The concrete LAPACK library is
/// picked by the `backend_*` cargo features.
#[derive(Debug, Default, Copy, Clone)]
pub struct LapackBackend;

impl BackendEigh for LapackBackend {
    fn name(&self) -> &'static str {
        "lapack-eigh"
    }

    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, PcaError> {
        if matrix.is_empty() {
            return Ok(EighOutput {
                eigenvalues: Array1::zeros(0),
                eigenvectors: Array2::zeros((0, 0)),
            });
        }
        let (eigenvalues, eigenvectors) =
            matrix
                .eigh(UPLO::Upper)
                .map_err(|e| PcaError::NumericalDivergence {
                    solver: BackendEigh::name(self),
                    detail: e.to_string(),
                })?;
        Ok(EighOutput {
            eigenvalues,
            eigenvectors,
        })
    }
}

impl BackendSVD for LapackBackend {
    fn name(&self) -> &'static str {
        "lapack-svd"
    }

    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput, PcaError> {
        let (u, s, vt) =
            matrix
                .svd_into(compute_u, compute_v)
                .map_err(|e| PcaError::NumericalDivergence {
                    solver: BackendSVD::name(self),
                    detail: e.to_string(),
                })?;
        Ok(SVDOutput { u, s, vt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_lapack_eigh_reconstructs_matrix() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let out = LapackBackend.eigh_upper(&a).unwrap();
        let lambda = Array2::from_diag(&out.eigenvalues);
        let rebuilt = out.eigenvectors.dot(&lambda).dot(&out.eigenvectors.t());
        for (x, y) in rebuilt.iter().zip(a.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_lapack_svd_returns_full_vt() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let out = LapackBackend.svd_into(a, false, true).unwrap();
        assert!(out.u.is_none());
        assert_eq!(out.s.len(), 2);
        assert_eq!(out.vt.unwrap().dim(), (3, 3));
    }
}
