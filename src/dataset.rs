use crate::error::PcaError;
use crate::stats::rows_to_matrix;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A rectangular table of observations (rows) over a fixed, named set of
/// variables (columns).
///
/// Owned by the caller; the analysis only ever borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetParts")]
pub struct Dataset {
    variables: Vec<String>,
    values: Array2<f64>,
}

/// Decoded fields, checked by [`Dataset::new`] before use.
#[derive(Deserialize)]
struct DatasetParts {
    variables: Vec<String>,
    values: Array2<f64>,
}

impl TryFrom<DatasetParts> for Dataset {
    type Error = PcaError;

    fn try_from(parts: DatasetParts) -> Result<Self, PcaError> {
        Dataset::new(parts.variables, parts.values)
    }
}

impl Dataset {
    /// Wraps a matrix of shape (n_observations, n_variables).
    ///
    /// # Errors
    /// `ShapeMismatch` if the number of names differs from the column count
    /// or if there are no columns at all.
    pub fn new(variables: Vec<String>, values: Array2<f64>) -> Result<Self, PcaError> {
        if variables.len() != values.ncols() {
            return Err(PcaError::ShapeMismatch {
                what: "variable names vs columns",
                expected: values.ncols(),
                found: variables.len(),
            });
        }
        if values.ncols() == 0 {
            return Err(PcaError::ShapeMismatch {
                what: "column count",
                expected: 1,
                found: 0,
            });
        }
        Ok(Self { variables, values })
    }

    /// Builds a dataset from row vectors, rejecting ragged rows.
    ///
    /// ```
    /// use pca_core::Dataset;
    ///
    /// let ds = Dataset::from_rows(
    ///     vec!["x".into(), "y".into()],
    ///     &[vec![0.0, 0.0], vec![2.0, 2.0], vec![4.0, 4.0]],
    /// ).unwrap();
    /// assert_eq!(ds.n_observations(), 3);
    /// ```
    pub fn from_rows(variables: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, PcaError> {
        if let Some(row) = rows.iter().find(|row| row.len() != variables.len()) {
            return Err(PcaError::ShapeMismatch {
                what: "row length",
                expected: variables.len(),
                found: row.len(),
            });
        }
        let values = if rows.is_empty() {
            Array2::zeros((0, variables.len()))
        } else {
            rows_to_matrix(rows)?
        };
        Self::new(variables, values)
    }

    /// Wraps a matrix with generated variable names `V1..Vp`.
    pub fn unnamed(values: Array2<f64>) -> Result<Self, PcaError> {
        let variables = (1..=values.ncols()).map(|i| format!("V{}", i)).collect();
        Self::new(variables, values)
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn observation(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.values.nrows()).then(|| self.values.row(index))
    }

    pub fn n_observations(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_variables(&self) -> usize {
        self.values.ncols()
    }
}
