use crate::error::{check_component_count, PcaError};
use crate::normalize::Component;
use crate::preprocess::Centering;
use ndarray::{s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Coordinates of observations in component space.
/// Shape: (n_observations, k_components)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    values: Array2<f64>,
}

impl Scores {
    pub fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_observations(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.values.ncols()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }
}

/// Stacks the first `k` loading vectors as columns. Shape: (n_variables, k)
pub fn loadings_matrix(components: &[Component], n_variables: usize, k: usize) -> Array2<f64> {
    let mut matrix = Array2::zeros((n_variables, k));
    for (mut column, component) in matrix.axis_iter_mut(Axis(1)).zip(components.iter()) {
        column.assign(&component.loading());
    }
    matrix
}

/// Projects observations onto the first `k` components.
///
/// Each row of `data` is centered (and scaled) with the training transform
/// before taking its dot product with every loading vector.
///
/// # Errors
/// - `InvalidComponentCount` if `k` is 0 or exceeds `components.len()`.
/// - `ShapeMismatch` if `data` has the wrong number of columns.
pub fn project(
    data: ArrayView2<f64>,
    centering: &Centering,
    components: &[Component],
    k: usize,
) -> Result<Scores, PcaError> {
    check_component_count(k, components.len())?;
    let centered = centering.apply(data)?;
    Ok(project_centered(centered.view(), components, k))
}

pub(crate) fn project_centered(
    centered: ArrayView2<f64>,
    components: &[Component],
    k: usize,
) -> Scores {
    let rotation = loadings_matrix(components, centered.ncols(), k);
    Scores::new(centered.dot(&rotation))
}

/// Maps scores back to centered (and scaled, if the model was) variable
/// space using only the first `k` components.
///
/// With every component this inverts [`project`] up to rounding; with fewer,
/// the residual is the variance carried by the discarded components.
///
/// # Errors
/// `InvalidComponentCount` if `k` is 0, exceeds the number of components, or
/// exceeds the number of score columns.
pub fn reconstruct(
    scores: &Scores,
    components: &[Component],
    k: usize,
) -> Result<Array2<f64>, PcaError> {
    check_component_count(k, components.len().min(scores.n_components()))?;
    let n_variables = components.first().map_or(0, |c| c.loading().len());
    let rotation = loadings_matrix(components, n_variables, k);
    let truncated = scores.values.slice(s![.., ..k]);
    Ok(truncated.dot(&rotation.t()))
}
