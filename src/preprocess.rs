use crate::dataset::Dataset;
use crate::error::PcaError;
use crate::stats::{column_means, column_std_devs};
use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A standard deviation at or below this fraction of the column's largest
/// absolute value is treated as zero.
const DEGENERATE_STD_TOLERANCE: f64 = 1e-12;

/// The per-column transform learned from the training data.
///
/// Kept separately from the centered matrix so new observations can be
/// mapped through exactly the same transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centering {
    /// Shape: (n_variables)
    mean: Array1<f64>,
    /// Sample standard deviations; `None` when the data was only centered.
    /// Shape: (n_variables)
    scale: Option<Array1<f64>>,
}

impl Centering {
    pub(crate) fn from_parts(
        mean: Array1<f64>,
        scale: Option<Array1<f64>>,
    ) -> Result<Self, PcaError> {
        if let Some(ref s) = scale {
            if s.len() != mean.len() {
                return Err(PcaError::ShapeMismatch {
                    what: "scale vs mean length",
                    expected: mean.len(),
                    found: s.len(),
                });
            }
        }
        Ok(Self { mean, scale })
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn is_scaled(&self) -> bool {
        self.scale.is_some()
    }

    pub fn n_variables(&self) -> usize {
        self.mean.len()
    }

    /// Subtracts the mean (and divides by the scale) column by column.
    pub fn apply(&self, data: ArrayView2<f64>) -> Result<Array2<f64>, PcaError> {
        self.check_width(data.ncols())?;
        let mut out = &data - &self.mean;
        if let Some(ref scale) = self.scale {
            out /= scale;
        }
        Ok(out)
    }

    /// Inverse of [`Centering::apply`].
    pub fn restore(&self, centered: ArrayView2<f64>) -> Result<Array2<f64>, PcaError> {
        self.check_width(centered.ncols())?;
        let mut out = centered.to_owned();
        if let Some(ref scale) = self.scale {
            out *= scale;
        }
        out += &self.mean;
        Ok(out)
    }

    fn check_width(&self, ncols: usize) -> Result<(), PcaError> {
        if ncols != self.mean.len() {
            return Err(PcaError::ShapeMismatch {
                what: "observation width",
                expected: self.mean.len(),
                found: ncols,
            });
        }
        Ok(())
    }
}

/// A dataset with its column means removed, and optionally divided by the
/// column standard deviations (correlation mode).
#[derive(Debug, Clone)]
pub struct CenteredMatrix {
    data: Array2<f64>,
    centering: Centering,
}

impl CenteredMatrix {
    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn centering(&self) -> &Centering {
        &self.centering
    }

    pub fn n_observations(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_variables(&self) -> usize {
        self.data.ncols()
    }

    pub(crate) fn into_parts(self) -> (Array2<f64>, Centering) {
        (self.data, self.centering)
    }
}

/// Centers (and with `scale`, standardizes) every column of the dataset.
///
/// The dataset itself is left untouched.
///
/// # Errors
/// - `InsufficientObservations` with fewer than two rows.
/// - `DegenerateColumn` when `scale` is set and a column is constant.
pub fn prepare(dataset: &Dataset, scale: bool) -> Result<CenteredMatrix, PcaError> {
    let values = dataset.values();
    let n_samples = values.nrows();
    if n_samples < 2 {
        return Err(PcaError::InsufficientObservations { found: n_samples });
    }

    let mean = column_means(values)?;
    let mut data = &values - &mean;

    let scale_vector = if scale {
        let std_devs = column_std_devs(values)?;
        let magnitudes = values.map_axis(Axis(0), |column| {
            column.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
        });
        for (column, (&s, &magnitude)) in std_devs.iter().zip(magnitudes.iter()).enumerate() {
            if !(s > DEGENERATE_STD_TOLERANCE * magnitude) {
                return Err(PcaError::DegenerateColumn {
                    column,
                    variable: dataset.variables()[column].clone(),
                });
            }
        }
        data /= &std_devs;
        Some(std_devs)
    } else {
        None
    };

    debug!(
        "Prepared {}x{} matrix (scaled: {}), column means {:?}",
        n_samples,
        values.ncols(),
        scale,
        mean.as_slice()
    );

    Ok(CenteredMatrix {
        data,
        centering: Centering::from_parts(mean, scale_vector)?,
    })
}
