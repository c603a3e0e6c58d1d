// Principal component analysis (PCA)

#![doc = include_str!("../README.md")]

pub mod dataset;
pub mod decompose;
pub mod diagnostics;
pub mod error;
pub mod jacobi;
pub mod linalg_backends;
pub mod metrics;
pub mod normalize;
pub mod pca;
pub mod preprocess;
pub mod projector;
pub mod stats;

pub use dataset::Dataset;
pub use decompose::{decompose, Decomposition, DecompositionMethod, DecompositionOptions};
pub use error::PcaError;
pub use metrics::{Entity, QualityMetrics};
pub use normalize::{normalize, Component};
pub use pca::{analyze_batch, Pca, PcaConfig, PcaModel};
pub use preprocess::{prepare, CenteredMatrix, Centering};
pub use projector::{project, reconstruct, Scores};

#[cfg(test)]
mod pca_tests;
