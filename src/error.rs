use std::error::Error;
use std::fmt::{self, Display};

/// Errors produced by the PCA pipeline.
///
/// Every failure is returned as a value from the operation that failed;
/// nothing is signalled through sentinel zeros or NaNs.
#[derive(Debug, Clone, PartialEq)]
pub enum PcaError {
    /// Ragged input, or two operands whose dimensions do not agree.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A constant column cannot be scaled to unit variance.
    DegenerateColumn { column: usize, variable: String },
    /// The data spans fewer independent directions than it has columns.
    /// Recoverable: the analysis still succeeds.
    RankDeficient { rank: usize, columns: usize },
    /// The solver failed to produce a valid decomposition.
    NumericalDivergence { solver: &'static str, detail: String },
    /// Requested `k` is zero or exceeds the available components.
    InvalidComponentCount { requested: usize, available: usize },
    /// A dataset's variables differ from the ones the model was fitted on.
    VariableMismatch {
        index: usize,
        expected: String,
        found: String,
    },
    /// The n-1 denominator needs at least two observations.
    InsufficientObservations { found: usize },
    /// A variable, observation or component index past the end.
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    /// A decoded model is unreadable or internally inconsistent.
    InvalidModel(String),
}

impl Display for PcaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PcaError::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "shape mismatch in {}: expected {}, found {}",
                what, expected, found
            ),
            PcaError::DegenerateColumn { column, variable } => write!(
                f,
                "column {} ('{}') has zero standard deviation and cannot be scaled",
                column, variable
            ),
            PcaError::RankDeficient { rank, columns } => write!(
                f,
                "data is rank deficient: rank {} with {} columns",
                rank, columns
            ),
            PcaError::NumericalDivergence { solver, detail } => {
                write!(f, "{} solver diverged: {}", solver, detail)
            }
            PcaError::InvalidComponentCount {
                requested,
                available,
            } => write!(
                f,
                "invalid component count {}: must be between 1 and {}",
                requested, available
            ),
            PcaError::VariableMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "variable {} is '{}', expected '{}'",
                index, found, expected
            ),
            PcaError::InsufficientObservations { found } => write!(
                f,
                "at least 2 observations are required, found {}",
                found
            ),
            PcaError::IndexOutOfRange { what, index, len } => {
                write!(f, "{} index {} out of range (len {})", what, index, len)
            }
            PcaError::InvalidModel(reason) => write!(f, "invalid PCA model: {}", reason),
        }
    }
}

impl Error for PcaError {}

/// Validates a requested component count against what is available.
pub(crate) fn check_component_count(requested: usize, available: usize) -> Result<(), PcaError> {
    if requested == 0 || requested > available {
        return Err(PcaError::InvalidComponentCount {
            requested,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_count_bounds() {
        assert!(check_component_count(1, 3).is_ok());
        assert!(check_component_count(3, 3).is_ok());
        assert_eq!(
            check_component_count(0, 3),
            Err(PcaError::InvalidComponentCount {
                requested: 0,
                available: 3
            })
        );
        assert_eq!(
            check_component_count(4, 3),
            Err(PcaError::InvalidComponentCount {
                requested: 4,
                available: 3
            })
        );
    }

    #[test]
    fn test_display_names_the_column() {
        let err = PcaError::DegenerateColumn {
            column: 2,
            variable: "height".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("height"));
        assert!(message.contains('2'));
    }
}
