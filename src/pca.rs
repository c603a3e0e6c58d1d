// Principal component analysis (PCA)

use crate::dataset::Dataset;
use crate::decompose::{
    decompose, DecompositionMethod, DecompositionOptions, DEFAULT_NEGATIVE_EIGENVALUE_TOLERANCE,
    DEFAULT_RANK_TOLERANCE,
};
use crate::diagnostics::{orthogonality_error, reconstruction_error};
use crate::error::PcaError;
use crate::metrics::{Entity, QualityMetrics};
use crate::normalize::{normalize, Component};
use crate::preprocess::{prepare, Centering};
use crate::projector::{self, loadings_matrix, project_centered, Scores};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Settings for one analysis.
///
/// There is no `Default`: centering-only and standardized PCA give
/// materially different components, so `scale` is always chosen explicitly.
///
/// ```
/// use pca_core::{DecompositionMethod, PcaConfig};
///
/// let config = PcaConfig::new(true).with_method(DecompositionMethod::Svd);
/// assert!(config.scale);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcaConfig {
    /// Divide each centered column by its sample standard deviation
    /// (correlation-matrix PCA).
    pub scale: bool,
    pub method: DecompositionMethod,
    /// See [`DecompositionOptions::negative_eigenvalue_tolerance`].
    pub negative_eigenvalue_tolerance: f64,
    /// See [`DecompositionOptions::rank_tolerance`].
    pub rank_tolerance: f64,
    /// Keep only as many components as the data has rank.
    pub drop_null_components: bool,
}

impl PcaConfig {
    pub fn new(scale: bool) -> Self {
        Self {
            scale,
            method: DecompositionMethod::default(),
            negative_eigenvalue_tolerance: DEFAULT_NEGATIVE_EIGENVALUE_TOLERANCE,
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
            drop_null_components: false,
        }
    }

    pub fn with_method(mut self, method: DecompositionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_drop_null_components(mut self, drop: bool) -> Self {
        self.drop_null_components = drop;
        self
    }

    fn decomposition_options(&self) -> DecompositionOptions {
        DecompositionOptions {
            method: self.method,
            negative_eigenvalue_tolerance: self.negative_eigenvalue_tolerance,
            rank_tolerance: self.rank_tolerance,
            drop_null_components: self.drop_null_components,
        }
    }
}

/// Runs analyses with a fixed configuration.
#[derive(Debug, Clone, Copy)]
pub struct Pca {
    config: PcaConfig,
}

impl Pca {
    pub fn new(config: PcaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Fits the principal axes of `dataset`.
    ///
    /// Pipeline: center (and scale) → decompose → order and fix signs →
    /// score the training observations on every component.
    ///
    /// # Errors
    /// - `InsufficientObservations` for fewer than two rows.
    /// - `DegenerateColumn` for a constant column when scaling.
    /// - `NumericalDivergence` if the eigensolver or SVD fails.
    ///
    /// Rank deficiency is not an error here; see [`PcaModel::check_full_rank`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pca_core::{Dataset, Pca, PcaConfig};
    ///
    /// let data = Dataset::from_rows(
    ///     vec!["x".into(), "y".into()],
    ///     &[vec![0.0, 0.0], vec![2.0, 2.0], vec![4.0, 4.0]],
    /// ).unwrap();
    /// let model = Pca::new(PcaConfig::new(false)).fit(&data).unwrap();
    /// assert_eq!(model.n_components(), 2);
    /// assert_eq!(model.rank(), 1);
    /// ```
    pub fn fit(&self, dataset: &Dataset) -> Result<PcaModel, PcaError> {
        let n_samples = dataset.n_observations();
        let n_features = dataset.n_variables();
        info!(
            "Starting PCA: {} observations x {} variables, scale={}, method={:?}",
            n_samples, n_features, self.config.scale, self.config.method
        );
        let start_time = std::time::Instant::now();

        let centered = prepare(dataset, self.config.scale)?;
        let decomposition = decompose(&centered, &self.config.decomposition_options())?;
        let rank = decomposition.rank;
        let components = normalize(decomposition.components);

        let (centered_data, centering) = centered.into_parts();
        let scores = project_centered(centered_data.view(), &components, components.len());

        let rotation = loadings_matrix(&components, n_features, components.len());
        if let Some(err) = orthogonality_error(&rotation.view()) {
            debug!("Loading orthogonality error ||I - VᵗV||_F = {:e}", err);
        }
        if components.len() == n_features {
            let rebuilt = scores.values().dot(&rotation.t());
            if let Some(err) = reconstruction_error(&centered_data.view(), &rebuilt.view()) {
                debug!("Full reconstruction relative error = {:e}", err);
            }
        }

        info!(
            "Finished PCA in {:?}: {} components, rank {}",
            start_time.elapsed(),
            components.len(),
            rank
        );

        Ok(PcaModel {
            variables: dataset.variables().to_vec(),
            centering,
            components,
            scores,
            rank,
            method: self.config.method,
        })
    }
}

/// Fits every dataset independently and in parallel.
///
/// Results come back in input order; one failing dataset does not affect
/// the others.
pub fn analyze_batch(datasets: &[Dataset], config: &PcaConfig) -> Vec<Result<PcaModel, PcaError>> {
    let pca = Pca::new(*config);
    datasets.par_iter().map(|dataset| pca.fit(dataset)).collect()
}

/// The immutable result of one analysis.
///
/// Holds the variable names, the centering transform, the ordered
/// components and the scores of the training observations. Consumers borrow
/// it; nothing in it changes after `fit` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaModel {
    variables: Vec<String>,
    centering: Centering,
    components: Vec<Component>,
    /// Training observations on every component.
    /// Shape: (n_observations, n_components)
    scores: Scores,
    rank: usize,
    method: DecompositionMethod,
}

impl PcaModel {
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn centering(&self) -> &Centering {
        &self.centering
    }

    /// Components ordered by descending explained variance.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of independent directions found in the data.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn method(&self) -> DecompositionMethod {
        self.method
    }

    /// `Err(RankDeficient)` if the data has fewer independent directions
    /// than variables.
    pub fn check_full_rank(&self) -> Result<(), PcaError> {
        if self.rank < self.n_variables() {
            return Err(PcaError::RankDeficient {
                rank: self.rank,
                columns: self.n_variables(),
            });
        }
        Ok(())
    }

    /// Eigenvalues, one per component, non-increasing.
    pub fn explained_variance(&self) -> Array1<f64> {
        self.components.iter().map(|c| c.explained_variance()).collect()
    }

    /// Each component's share of the total variance. All zeros if the data
    /// has no variance at all.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        let variances = self.explained_variance();
        let total = variances.sum();
        if total > 0.0 {
            variances / total
        } else {
            Array1::zeros(variances.len())
        }
    }

    pub fn cumulative_explained_variance_ratio(&self) -> Array1<f64> {
        let mut running = 0.0;
        self.explained_variance_ratio()
            .iter()
            .map(|r| {
                running += r;
                running
            })
            .collect()
    }

    /// Loading vectors as columns. Shape: (n_variables, n_components)
    pub fn loadings(&self) -> Array2<f64> {
        loadings_matrix(&self.components, self.n_variables(), self.n_components())
    }

    /// Scores of the observations the model was fitted on.
    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    /// Scores of `dataset` on the first `k` components.
    ///
    /// # Errors
    /// - `InvalidComponentCount` for `k == 0` or `k > n_components()`.
    /// - `ShapeMismatch` if the dataset has a different number of variables.
    /// - `VariableMismatch` if its variables are named or ordered differently.
    pub fn project(&self, dataset: &Dataset, k: usize) -> Result<Scores, PcaError> {
        if dataset.n_variables() != self.n_variables() {
            return Err(PcaError::ShapeMismatch {
                what: "observation width",
                expected: self.n_variables(),
                found: dataset.n_variables(),
            });
        }
        let renamed = self
            .variables
            .iter()
            .zip(dataset.variables())
            .position(|(expected, found)| expected != found);
        if let Some(index) = renamed {
            return Err(PcaError::VariableMismatch {
                index,
                expected: self.variables[index].clone(),
                found: dataset.variables()[index].clone(),
            });
        }
        self.project_values(dataset.values(), k)
    }

    /// Like [`PcaModel::project`] for a bare (n_observations, n_variables) matrix.
    pub fn project_values(&self, data: ArrayView2<f64>, k: usize) -> Result<Scores, PcaError> {
        projector::project(data, &self.centering, &self.components, k)
    }

    /// Centered (and scaled, if fitted that way) approximation of the data
    /// from the first `k` components of `scores`.
    pub fn reconstruct(&self, scores: &Scores, k: usize) -> Result<Array2<f64>, PcaError> {
        projector::reconstruct(scores, &self.components, k)
    }

    /// Like [`PcaModel::reconstruct`], mapped back to the original units.
    pub fn inverse_transform(&self, scores: &Scores, k: usize) -> Result<Array2<f64>, PcaError> {
        let centered = self.reconstruct(scores, k)?;
        self.centering.restore(centered.view())
    }

    /// Quality metrics over the training observations.
    pub fn quality(&self) -> QualityMetrics<'_> {
        QualityMetrics::for_model(&self.components, &self.scores)
    }

    pub fn contribution(&self, entity: Entity, component: usize) -> Result<f64, PcaError> {
        self.quality().contribution(entity, component)
    }

    pub fn cosine_squared(&self, entity: Entity, component: usize) -> Result<f64, PcaError> {
        self.quality().cosine_squared(entity, component)
    }

    /// Encodes the model with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PcaError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| PcaError::InvalidModel(format!("failed to encode PCA model: {}", e)))
    }

    /// Decodes a model written by [`PcaModel::to_bytes`] and checks that it
    /// is internally consistent.
    ///
    /// # Errors
    /// `InvalidModel` if the bytes cannot be decoded, dimensions disagree,
    /// scale factors are not positive, or explained variances are negative,
    /// non-finite or out of order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PcaError> {
        let (model, _): (PcaModel, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| PcaError::InvalidModel(format!("failed to decode PCA model: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), PcaError> {
        let d_features = self.variables.len();
        if self.centering.n_variables() != d_features {
            return Err(PcaError::InvalidModel(format!(
                "centering has {} variables, model names {}",
                self.centering.n_variables(),
                d_features
            )));
        }
        if let Some(scale) = self.centering.scale() {
            if scale.len() != d_features {
                return Err(PcaError::InvalidModel(format!(
                    "scale vector has {} entries, model names {} variables",
                    scale.len(),
                    d_features
                )));
            }
            if scale.iter().any(|&s| !s.is_finite() || s <= 0.0) {
                return Err(PcaError::InvalidModel(
                    "scale vector contains non-finite or non-positive values".to_string(),
                ));
            }
        }
        if self.components.len() > d_features {
            return Err(PcaError::InvalidModel(format!(
                "{} components for {} variables",
                self.components.len(),
                d_features
            )));
        }
        let mut previous = f64::INFINITY;
        for (i, component) in self.components.iter().enumerate() {
            if component.loading().len() != d_features {
                return Err(PcaError::InvalidModel(format!(
                    "component {} has {} loadings, expected {}",
                    i,
                    component.loading().len(),
                    d_features
                )));
            }
            let variance = component.explained_variance();
            if !variance.is_finite() || variance < 0.0 || variance > previous {
                return Err(PcaError::InvalidModel(format!(
                    "component {} has invalid or out-of-order explained variance {}",
                    i, variance
                )));
            }
            previous = variance;
        }
        if self.scores.n_components() != self.components.len() {
            return Err(PcaError::InvalidModel(format!(
                "scores have {} columns for {} components",
                self.scores.n_components(),
                self.components.len()
            )));
        }
        if self.rank > d_features {
            return Err(PcaError::InvalidModel(format!(
                "rank {} exceeds {} variables",
                self.rank, d_features
            )));
        }
        Ok(())
    }
}
