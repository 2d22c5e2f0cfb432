//! Observation history for an optimization run.
//!
//! [`History`] is the append-only log of evaluated configurations. The caller
//! owns it across the whole run; the advisor only reads derived views
//! (success counts, the numeric design matrix, transformed objective and
//! constraint arrays, incumbent values).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Configuration, SableResult, SearchSpace};

/// Whether an evaluation completed normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationState {
    Success,
    Failed,
}

/// An evaluated configuration plus its outcome.
///
/// Failed observations still occupy a history slot but are excluded from
/// success counts and incumbent computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub config: Configuration,
    /// Objective values (minimization convention). Empty for failed runs.
    pub objectives: Vec<f64>,
    /// Constraint values; feasible iff <= 0.
    pub constraints: Vec<f64>,
    pub state: ObservationState,
    pub created_at: DateTime<Utc>,
}

impl Observation {
    pub fn success(config: Configuration, objectives: Vec<f64>, constraints: Vec<f64>) -> Self {
        Self {
            config,
            objectives,
            constraints,
            state: ObservationState::Success,
            created_at: Utc::now(),
        }
    }

    pub fn failed(config: Configuration) -> Self {
        Self {
            config,
            objectives: Vec::new(),
            constraints: Vec::new(),
            state: ObservationState::Failed,
            created_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ObservationState::Success
    }
}

/// Transform applied to objective values when reading them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveTransform {
    /// Raw values; failed observations yield NaN.
    None,
    /// Failed observations are replaced per objective by the worst successful
    /// value, so they stay in the design matrix without attracting the model.
    FailedAsWorst,
}

/// Transform applied to constraint values when reading them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintTransform {
    None,
    /// sign(y) * ln(1 + |y|), compressing large violations.
    Bilog,
}

/// Append-only ordered sequence of observations for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub id: Uuid,
    observations: Vec<Observation>,
}

impl History {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            observations: Vec::new(),
        }
    }

    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations that completed normally.
    pub fn success_count(&self) -> usize {
        self.observations.iter().filter(|o| o.is_success()).count()
    }

    /// All evaluated configurations, in evaluation order.
    pub fn configurations(&self) -> Vec<Configuration> {
        self.observations.iter().map(|o| o.config.clone()).collect()
    }

    pub fn contains(&self, config: &Configuration) -> bool {
        self.observations.iter().any(|o| &o.config == config)
    }

    /// Numeric design matrix: one unit-cube row per observation.
    pub fn config_array(&self, space: &SearchSpace) -> SableResult<Vec<Vec<f64>>> {
        self.observations
            .iter()
            .map(|o| o.config.to_unit_vector(space))
            .collect()
    }

    /// Objective matrix, one row per observation.
    pub fn objectives(&self, transform: ObjectiveTransform) -> Vec<Vec<f64>> {
        let num_objectives = self
            .observations
            .iter()
            .find(|o| o.is_success())
            .map(|o| o.objectives.len())
            .unwrap_or(0);

        let worst: Vec<f64> = (0..num_objectives)
            .map(|i| {
                self.observations
                    .iter()
                    .filter(|o| o.is_success())
                    .map(|o| o.objectives[i])
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();

        self.observations
            .iter()
            .map(|o| {
                if o.is_success() {
                    o.objectives.clone()
                } else {
                    match transform {
                        ObjectiveTransform::None => vec![f64::NAN; num_objectives],
                        ObjectiveTransform::FailedAsWorst => worst.clone(),
                    }
                }
            })
            .collect()
    }

    /// Constraint matrix, one row per observation. Failed observations get
    /// a unit violation so constraint models treat them as infeasible.
    pub fn constraints(&self, transform: ConstraintTransform) -> Vec<Vec<f64>> {
        let num_constraints = self
            .observations
            .iter()
            .find(|o| o.is_success())
            .map(|o| o.constraints.len())
            .unwrap_or(0);

        self.observations
            .iter()
            .map(|o| {
                let row = if o.is_success() {
                    o.constraints.clone()
                } else {
                    vec![1.0; num_constraints]
                };
                match transform {
                    ConstraintTransform::None => row,
                    ConstraintTransform::Bilog => row
                        .iter()
                        .map(|&y| y.signum() * (1.0 + y.abs()).ln())
                        .collect(),
                }
            })
            .collect()
    }

    /// Best (smallest) first-objective value among successful observations.
    pub fn incumbent_value(&self) -> Option<f64> {
        self.observations
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.objectives[0])
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Per-objective best values among successful observations.
    pub fn mo_incumbent_values(&self) -> Vec<f64> {
        let num_objectives = self
            .observations
            .iter()
            .find(|o| o.is_success())
            .map(|o| o.objectives.len())
            .unwrap_or(0);

        (0..num_objectives)
            .map(|i| {
                self.observations
                    .iter()
                    .filter(|o| o.is_success())
                    .map(|o| o.objectives[i])
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// A prior run's data (unit-cube design matrix plus objective vector),
/// supplied at construction time for transfer learning. Immutable once
/// loaded; replaced only through the advisor's explicit refresh call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTask {
    pub design: Vec<Vec<f64>>,
    pub objectives: Vec<f64>,
}

impl SourceTask {
    pub fn new(design: Vec<Vec<f64>>, objectives: Vec<f64>) -> Self {
        Self { design, objectives }
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }
}
