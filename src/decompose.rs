use crate::error::PcaError;
use crate::jacobi::JacobiEigenSolver;
use crate::linalg_backends::{BackendEigh, BackendSVD, LapackBackend};
use crate::preprocess::CenteredMatrix;
use crate::stats::covariance_matrix;
use log::{debug, warn};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

pub const DEFAULT_JACOBI_MAX_SWEEPS: usize = 100;
pub const DEFAULT_JACOBI_TOLERANCE: f64 = 1e-13;
pub const DEFAULT_NEGATIVE_EIGENVALUE_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_RANK_TOLERANCE: f64 = 1e-10;

/// How the principal axes are extracted from the centered matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DecompositionMethod {
    /// Eigendecomposition of the p×p covariance matrix with LAPACK.
    #[default]
    CovarianceEigh,
    /// Eigendecomposition of the covariance matrix with the bounded
    /// cyclic Jacobi solver.
    CovarianceJacobi { max_sweeps: usize, tolerance: f64 },
    /// SVD of the centered matrix itself; the covariance matrix is never formed.
    Svd,
}

impl DecompositionMethod {
    /// Jacobi route with default sweep bound and tolerance.
    pub fn jacobi() -> Self {
        DecompositionMethod::CovarianceJacobi {
            max_sweeps: DEFAULT_JACOBI_MAX_SWEEPS,
            tolerance: DEFAULT_JACOBI_TOLERANCE,
        }
    }
}

/// Numerical knobs for [`decompose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompositionOptions {
    pub method: DecompositionMethod,
    /// Negative eigenvalues no further below zero than this fraction of the
    /// largest eigenvalue magnitude are rounding noise and clamped to 0.
    pub negative_eigenvalue_tolerance: f64,
    /// Eigenvalues at or below this fraction of the largest one do not count
    /// towards the rank.
    pub rank_tolerance: f64,
    /// Discard components beyond the rank instead of keeping them with
    /// (near) zero explained variance.
    pub drop_null_components: bool,
}

impl Default for DecompositionOptions {
    fn default() -> Self {
        Self {
            method: DecompositionMethod::default(),
            negative_eigenvalue_tolerance: DEFAULT_NEGATIVE_EIGENVALUE_TOLERANCE,
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
            drop_null_components: false,
        }
    }
}

/// One eigenpair as it came out of the solver, before ordering and sign
/// normalization.
#[derive(Debug, Clone)]
pub struct RawComponent {
    /// Position in the solver's own output; used to break ties deterministically.
    pub solver_index: usize,
    /// Unit-length loading vector. Shape: (n_variables)
    pub loading: Array1<f64>,
    /// Non-negative explained variance (eigenvalue of the covariance matrix).
    pub explained_variance: f64,
}

/// Unordered eigenpairs plus the detected rank.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub components: Vec<RawComponent>,
    pub rank: usize,
    pub n_variables: usize,
}

impl Decomposition {
    pub fn is_full_rank(&self) -> bool {
        self.rank == self.n_variables
    }

    /// `Some(RankDeficient)` when fewer independent directions than columns
    /// were found. This never aborts the analysis.
    pub fn rank_deficiency(&self) -> Option<PcaError> {
        (!self.is_full_rank()).then(|| PcaError::RankDeficient {
            rank: self.rank,
            columns: self.n_variables,
        })
    }
}

/// Computes the eigenpairs of the covariance matrix `(XᵗX) / (n-1)` of the
/// centered matrix `X`, by whichever route `options.method` selects.
///
/// # Errors
/// - `InsufficientObservations` with fewer than two rows.
/// - `NumericalDivergence` if the solver fails or does not converge, returns
///   non-finite values, a clearly negative eigenvalue, or a null eigenvector.
pub fn decompose(
    centered: &CenteredMatrix,
    options: &DecompositionOptions,
) -> Result<Decomposition, PcaError> {
    let n_samples = centered.n_observations();
    let n_variables = centered.n_variables();
    if n_samples < 2 {
        return Err(PcaError::InsufficientObservations { found: n_samples });
    }

    let (solver, pairs): (&'static str, Vec<(f64, Array1<f64>)>) = match options.method {
        DecompositionMethod::CovarianceEigh => {
            let cov = covariance_matrix(centered.data())?;
            let out = LapackBackend.eigh_upper(&cov)?;
            (
                BackendEigh::name(&LapackBackend),
                eigenpairs(out.eigenvalues.view(), out.eigenvectors.columns().into_iter()),
            )
        }
        DecompositionMethod::CovarianceJacobi {
            max_sweeps,
            tolerance,
        } => {
            let solver = JacobiEigenSolver::new(max_sweeps, tolerance);
            let cov = covariance_matrix(centered.data())?;
            let out = solver.eigh_upper(&cov)?;
            (
                solver.name(),
                eigenpairs(out.eigenvalues.view(), out.eigenvectors.columns().into_iter()),
            )
        }
        DecompositionMethod::Svd => {
            let out = LapackBackend.svd_into(centered.data().to_owned(), false, true)?;
            let vt = out.vt.ok_or_else(|| PcaError::NumericalDivergence {
                solver: BackendSVD::name(&LapackBackend),
                detail: "right singular vectors were not returned".to_string(),
            })?;
            let denom = (n_samples - 1) as f64;
            // Directions past min(n, p) carry no variance.
            let variances: Array1<f64> = (0..vt.nrows())
                .map(|i| out.s.get(i).map_or(0.0, |s| s * s / denom))
                .collect();
            (
                BackendSVD::name(&LapackBackend),
                eigenpairs(variances.view(), vt.rows().into_iter()),
            )
        }
    };

    if pairs.len() != n_variables {
        return Err(PcaError::NumericalDivergence {
            solver,
            detail: format!(
                "expected {} eigenpairs, solver returned {}",
                n_variables,
                pairs.len()
            ),
        });
    }

    let magnitude = pairs
        .iter()
        .map(|(value, _)| value.abs())
        .fold(0.0_f64, f64::max);
    let negative_floor = -options.negative_eigenvalue_tolerance * magnitude;

    let mut components = Vec::with_capacity(pairs.len());
    for (solver_index, (value, mut loading)) in pairs.into_iter().enumerate() {
        if !value.is_finite() || loading.iter().any(|x| !x.is_finite()) {
            return Err(PcaError::NumericalDivergence {
                solver,
                detail: format!("non-finite eigenpair at index {}", solver_index),
            });
        }
        let explained_variance = clamp_eigenvalue(value, negative_floor, solver, solver_index)?;

        let norm = loading.dot(&loading).sqrt();
        if !(norm > 1e-12) {
            return Err(PcaError::NumericalDivergence {
                solver,
                detail: format!("eigenvector at index {} has zero length", solver_index),
            });
        }
        loading.mapv_inplace(|x| x / norm);

        components.push(RawComponent {
            solver_index,
            loading,
            explained_variance,
        });
    }

    let largest = components
        .iter()
        .map(|c| c.explained_variance)
        .fold(0.0_f64, f64::max);
    let rank_threshold = options.rank_tolerance * largest;
    let is_signal = |c: &RawComponent| largest > 0.0 && c.explained_variance > rank_threshold;
    let rank = components.iter().filter(|&c| is_signal(c)).count();

    if rank < n_variables {
        warn!(
            "Covariance matrix is rank deficient: rank {} with {} columns.",
            rank, n_variables
        );
        if options.drop_null_components {
            components.retain(|c| is_signal(c));
            debug!("Dropped {} null components.", n_variables - rank);
        }
    }

    debug!(
        "Decomposed {}x{} matrix with {}: rank {}, {} components kept.",
        n_samples,
        n_variables,
        solver,
        rank,
        components.len()
    );

    Ok(Decomposition {
        components,
        rank,
        n_variables,
    })
}

/// Clamps a slightly negative eigenvalue to zero. Anything below
/// `negative_floor` (a non-positive bound) is a solver failure.
fn clamp_eigenvalue(
    value: f64,
    negative_floor: f64,
    solver: &'static str,
    solver_index: usize,
) -> Result<f64, PcaError> {
    if value >= 0.0 {
        return Ok(value);
    }
    if value < negative_floor {
        return Err(PcaError::NumericalDivergence {
            solver,
            detail: format!(
                "eigenvalue {:e} at index {} is negative beyond tolerance",
                value, solver_index
            ),
        });
    }
    debug!("Clamping eigenvalue {:e} at index {} to zero.", value, solver_index);
    Ok(0.0)
}

fn eigenpairs<'a, I>(values: ArrayView1<f64>, vectors: I) -> Vec<(f64, Array1<f64>)>
where
    I: Iterator<Item = ArrayView1<'a, f64>>,
{
    values
        .iter()
        .copied()
        .zip(vectors.map(|v| v.to_owned()))
        .collect()
}
