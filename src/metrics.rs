// Representation-quality measures: contribution and cosine-squared.

use crate::error::PcaError;
use crate::normalize::Component;
use crate::projector::Scores;
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// What a quality metric is measured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// An original variable (column), by index.
    Variable(usize),
    /// An observation (row) of the scores the metrics were built from.
    Observation(usize),
}

impl Entity {
    pub fn index(&self) -> usize {
        match *self {
            Entity::Variable(i) | Entity::Observation(i) => i,
        }
    }
}

/// Contribution and cosine-squared of variables and observations with
/// respect to each component.
///
/// Borrows the ordered components and the scores of every observation on
/// *all* of them; nothing is cached.
#[derive(Debug, Clone, Copy)]
pub struct QualityMetrics<'a> {
    components: &'a [Component],
    scores: ArrayView2<'a, f64>,
}

impl<'a> QualityMetrics<'a> {
    /// # Errors
    /// `ShapeMismatch` if the scores do not have one column per component.
    pub fn new(components: &'a [Component], scores: &'a Scores) -> Result<Self, PcaError> {
        if scores.n_components() != components.len() {
            return Err(PcaError::ShapeMismatch {
                what: "score columns vs components",
                expected: components.len(),
                found: scores.n_components(),
            });
        }
        Ok(Self {
            components,
            scores: scores.values(),
        })
    }

    /// For a fitted model, whose scores always span every component.
    pub(crate) fn for_model(components: &'a [Component], scores: &'a Scores) -> Self {
        Self {
            components,
            scores: scores.values(),
        }
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Share of the component attributable to the entity, in percent.
    ///
    /// For a variable, its squared loading over the sum of squared loadings;
    /// for an observation, its squared score over the component's total sum
    /// of squared scores. Either way the values for one component sum to 100.
    /// A component on which every observation scores zero gives 0.
    pub fn contribution(&self, entity: Entity, component: usize) -> Result<f64, PcaError> {
        let column = self.column(entity, component)?;
        let value = column[entity.index()];
        let total = column.dot(&column);
        if total <= 0.0 {
            return Ok(0.0);
        }
        Ok(100.0 * value * value / total)
    }

    /// Squared cosine of the angle between the entity and the component axis,
    /// in `[0, 1]`.
    ///
    /// For a variable this is its squared loading. For an observation it is
    /// its squared score over its squared distance from the origin in the
    /// full component space; an observation at the origin gives 0.
    pub fn cosine_squared(&self, entity: Entity, component: usize) -> Result<f64, PcaError> {
        let column = self.column(entity, component)?;
        match entity {
            Entity::Variable(i) => Ok(column[i] * column[i]),
            Entity::Observation(i) => {
                let row = self.scores.row(i);
                let distance_sq = row.dot(&row);
                if distance_sq <= 0.0 {
                    return Ok(0.0);
                }
                Ok((row[component] * row[component] / distance_sq).clamp(0.0, 1.0))
            }
        }
    }

    /// Variable contributions in percent. Shape: (n_variables, n_components)
    pub fn variable_contributions(&self) -> Array2<f64> {
        self.variable_cos2().mapv(|x| 100.0 * x) / &self.loading_column_norms()
    }

    /// Variable cosine-squared values. Shape: (n_variables, n_components)
    pub fn variable_cos2(&self) -> Array2<f64> {
        let p = self.components.first().map_or(0, |c| c.loading().len());
        Array2::from_shape_fn((p, self.components.len()), |(i, j)| {
            let l = self.components[j].loading()[i];
            l * l
        })
    }

    /// Observation contributions in percent. Shape: (n_observations, n_components)
    pub fn observation_contributions(&self) -> Array2<f64> {
        let squared = self.scores.mapv(|x| x * x);
        let totals = squared.sum_axis(Axis(0));
        let mut out = squared;
        for (mut column, &total) in out.columns_mut().into_iter().zip(totals.iter()) {
            if total > 0.0 {
                column.mapv_inplace(|x| 100.0 * x / total);
            } else {
                column.fill(0.0);
            }
        }
        out
    }

    /// Observation cosine-squared values. Shape: (n_observations, n_components)
    pub fn observation_cos2(&self) -> Array2<f64> {
        let mut out = self.scores.mapv(|x| x * x);
        for mut row in out.rows_mut() {
            let distance_sq = row.sum();
            if distance_sq > 0.0 {
                row.mapv_inplace(|x| (x / distance_sq).clamp(0.0, 1.0));
            } else {
                row.fill(0.0);
            }
        }
        out
    }

    fn loading_column_norms(&self) -> Array1<f64> {
        self.components
            .iter()
            .map(|c| {
                let ss = c.loading().dot(&c.loading());
                if ss > 0.0 {
                    ss
                } else {
                    1.0
                }
            })
            .collect()
    }

    /// The loading vector (for a variable) or score column (for an
    /// observation) that the entity is measured against.
    fn column(&self, entity: Entity, component: usize) -> Result<Array1<f64>, PcaError> {
        if component >= self.components.len() {
            return Err(PcaError::IndexOutOfRange {
                what: "component",
                index: component,
                len: self.components.len(),
            });
        }
        match entity {
            Entity::Variable(i) => {
                let loading = self.components[component].loading();
                if i >= loading.len() {
                    return Err(PcaError::IndexOutOfRange {
                        what: "variable",
                        index: i,
                        len: loading.len(),
                    });
                }
                Ok(loading.to_owned())
            }
            Entity::Observation(i) => {
                if i >= self.scores.nrows() {
                    return Err(PcaError::IndexOutOfRange {
                        what: "observation",
                        index: i,
                        len: self.scores.nrows(),
                    });
                }
                Ok(self.scores.column(component).to_owned())
            }
        }
    }
}
