// Cyclic Jacobi eigensolver for small symmetric matrices.

use crate::error::PcaError;
use crate::linalg_backends::{BackendEigh, EighOutput};
use log::trace;
use ndarray::Array2;

/// Pure-Rust symmetric eigensolver.
///
/// Each sweep annihilates every off-diagonal pair once with a Jacobi
/// rotation. The solver stops when the off-diagonal Frobenius norm drops to
/// `tolerance` times the Frobenius norm of the input, and fails with
/// `NumericalDivergence` if that has not happened after `max_sweeps` sweeps.
#[derive(Debug, Clone, Copy)]
pub struct JacobiEigenSolver {
    pub max_sweeps: usize,
    pub tolerance: f64,
}

impl JacobiEigenSolver {
    pub fn new(max_sweeps: usize, tolerance: f64) -> Self {
        Self {
            max_sweeps,
            tolerance,
        }
    }
}

fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
    let n = a.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += a[[i, j]] * a[[i, j]];
            }
        }
    }
    sum.sqrt()
}

/// Applies the rotation J(p, q, c, s) as A <- JᵗAJ and V <- VJ.
fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    let n = a.nrows();
    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = c * akp - s * akq;
        a[[k, q]] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = c * apk - s * aqk;
        a[[q, k]] = s * apk + c * aqk;
    }
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;
    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = c * vkp - s * vkq;
        v[[k, q]] = s * vkp + c * vkq;
    }
}

impl BackendEigh for JacobiEigenSolver {
    fn name(&self) -> &'static str {
        "jacobi"
    }

    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, PcaError> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(PcaError::ShapeMismatch {
                what: "square matrix",
                expected: n,
                found: matrix.ncols(),
            });
        }

        // Only the upper triangle is trusted.
        let mut a = Array2::from_shape_fn((n, n), |(i, j)| {
            if i <= j {
                matrix[[i, j]]
            } else {
                matrix[[j, i]]
            }
        });
        let mut v = Array2::<f64>::eye(n);

        let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let threshold = self.tolerance * scale;

        let mut sweeps = 0;
        loop {
            let off = off_diagonal_norm(&a);
            trace!("Jacobi sweep {}: off-diagonal norm {:e}", sweeps, off);
            if off <= threshold {
                break;
            }
            if sweeps >= self.max_sweeps {
                return Err(PcaError::NumericalDivergence {
                    solver: self.name(),
                    detail: format!(
                        "off-diagonal norm {:e} above {:e} after {} sweeps",
                        off, threshold, sweeps
                    ),
                });
            }
            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[[p, q]];
                    if apq == 0.0 {
                        continue;
                    }
                    // Golub & Van Loan symmetric Schur decomposition of the 2x2 block.
                    let tau = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                    let t = if tau >= 0.0 {
                        1.0 / (tau + (1.0 + tau * tau).sqrt())
                    } else {
                        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                    };
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = t * c;
                    rotate(&mut a, &mut v, p, q, c, s);
                }
            }
            sweeps += 1;
        }

        Ok(EighOutput {
            eigenvalues: a.diag().to_owned(),
            eigenvectors: v,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_jacobi_two_by_two() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let out = JacobiEigenSolver::new(10, 1e-14).eigh_upper(&a).unwrap();
        let mut values = out.eigenvalues.to_vec();
        values.sort_by(|x, y| x.total_cmp(y));
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobi_satisfies_eigen_equation() {
        let a = array![
            [5.0, 2.0, 1.0, 0.3],
            [2.0, 3.0, 0.5, -0.2],
            [1.0, 0.5, 1.0, 0.1],
            [0.3, -0.2, 0.1, 0.7]
        ];
        let out = JacobiEigenSolver::new(50, 1e-14).eigh_upper(&a).unwrap();
        for i in 0..4 {
            let vec_i = out.eigenvectors.column(i);
            let av = a.dot(&vec_i);
            for k in 0..4 {
                assert_abs_diff_eq!(av[k], out.eigenvalues[i] * vec_i[k], epsilon = 1e-10);
            }
            assert_abs_diff_eq!(vec_i.dot(&vec_i), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_jacobi_reports_divergence_when_sweeps_exhausted() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let err = JacobiEigenSolver::new(0, 1e-14).eigh_upper(&a).unwrap_err();
        assert!(matches!(err, PcaError::NumericalDivergence { solver: "jacobi", .. }));
    }

    #[test]
    fn test_jacobi_diagonal_input_needs_no_sweeps() {
        let a = array![[3.0, 0.0], [0.0, 1.0]];
        let out = JacobiEigenSolver::new(0, 1e-14).eigh_upper(&a).unwrap();
        assert_eq!(out.eigenvalues.to_vec(), vec![3.0, 1.0]);
        assert_eq!(out.eigenvectors, Array2::<f64>::eye(2));
    }

    #[test]
    fn test_jacobi_zero_matrix() {
        let a = Array2::<f64>::zeros((3, 3));
        let out = JacobiEigenSolver::new(0, 1e-14).eigh_upper(&a).unwrap();
        assert!(out.eigenvalues.iter().all(|&x| x == 0.0));
    }
}
