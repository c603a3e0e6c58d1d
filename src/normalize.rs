// Deterministic ordering and sign convention for principal components.

use crate::decompose::RawComponent;
use float_cmp::{ApproxEq, F64Margin};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Two coefficient magnitudes within this margin count as equally large
/// when choosing which coefficient decides the sign.
const SIGN_TIE_MARGIN: F64Margin = F64Margin {
    epsilon: 1e-12,
    ulps: 4,
};

/// One principal axis: a unit-length loading vector and the variance of the
/// data along it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// One weight per original variable. Shape: (n_variables)
    loading: Array1<f64>,
    explained_variance: f64,
}

impl Component {
    pub(crate) fn new(loading: Array1<f64>, explained_variance: f64) -> Self {
        Self {
            loading,
            explained_variance,
        }
    }

    pub fn loading(&self) -> ArrayView1<'_, f64> {
        self.loading.view()
    }

    pub fn explained_variance(&self) -> f64 {
        self.explained_variance
    }
}

/// Index of the coefficient that decides a loading vector's sign: the first
/// one whose magnitude equals the largest magnitude.
pub fn sign_pivot(loading: ArrayView1<f64>) -> Option<usize> {
    let largest = loading.iter().map(|x| x.abs()).fold(0.0_f64, f64::max);
    loading
        .iter()
        .position(|x| x.abs().approx_eq(largest, SIGN_TIE_MARGIN))
}

/// Orders components by descending explained variance and fixes their signs.
///
/// - Order: descending explained variance; equal variances keep the
///   solver's index order.
/// - Sign: the first coefficient with the largest magnitude is made positive.
///   Loadings are only defined up to sign, so this rule is what makes two
///   runs (or two solvers) on the same input agree.
///
/// Anything cached from components must be recomputed if this rule changes.
pub fn normalize(mut raw: Vec<RawComponent>) -> Vec<Component> {
    raw.sort_by(|a, b| {
        b.explained_variance
            .total_cmp(&a.explained_variance)
            .then(a.solver_index.cmp(&b.solver_index))
    });

    raw.into_iter()
        .map(|rc| {
            let mut loading = rc.loading;
            if let Some(pivot) = sign_pivot(loading.view()) {
                if loading[pivot] < 0.0 {
                    loading.mapv_inplace(|x| -x);
                }
            }
            Component::new(loading, rc.explained_variance)
        })
        .collect()
}
