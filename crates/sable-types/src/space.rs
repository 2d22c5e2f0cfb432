//! Search space definitions and configuration encoding.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{SableResult, SpaceError};

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Human-readable parameter name (e.g. "learning_rate").
    pub name: String,
    /// The kind of search range.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous uniform range [low, high].
    FloatRange { low: f64, high: f64 },
    /// Integer range [low, high] inclusive.
    IntRange { low: i64, high: i64 },
    /// Log-uniform range (sampled in log-space then exponentiated).
    LogUniform { low: f64, high: f64 },
    /// Categorical choices.
    Choice { values: Vec<serde_json::Value> },
    /// A fixed value that never varies.
    Constant { value: serde_json::Value },
}

/// A concrete parameter value inside a [`Configuration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Json(serde_json::Value),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

/// One point in the search space: an ordered vector of parameter values
/// aligned with the space's parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub values: Vec<ParameterValue>,
}

impl Configuration {
    pub fn new(values: Vec<ParameterValue>) -> Self {
        Self { values }
    }

    /// Membership test against already-seen configurations.
    pub fn is_in(&self, configs: &[Configuration]) -> bool {
        configs.contains(self)
    }

    /// Encode to a fixed-length numeric vector in the unit cube.
    ///
    /// Float/int/log-uniform dimensions map linearly (in log-space for the
    /// latter) onto [0, 1]; a choice with c values maps its index onto
    /// {0, 1/(c-1), ..., 1}; constants encode as 0.
    pub fn to_unit_vector(&self, space: &SearchSpace) -> SableResult<Vec<f64>> {
        if self.values.len() != space.parameters.len() {
            return Err(SpaceError::DimensionMismatch {
                got: self.values.len(),
                expected: space.parameters.len(),
            }
            .into());
        }

        let mut out = Vec::with_capacity(self.values.len());
        for (param, value) in space.parameters.iter().zip(&self.values) {
            let invalid = || SpaceError::InvalidValue {
                name: param.name.clone(),
            };
            let encoded = match (&param.kind, value) {
                (ParameterKind::FloatRange { low, high }, ParameterValue::Float(v)) => {
                    if high > low {
                        (v - low) / (high - low)
                    } else {
                        0.5
                    }
                }
                (ParameterKind::IntRange { low, high }, ParameterValue::Int(v)) => {
                    if high > low {
                        (v - low) as f64 / (high - low) as f64
                    } else {
                        0.5
                    }
                }
                (ParameterKind::LogUniform { low, high }, ParameterValue::Float(v)) => {
                    let span = high.ln() - low.ln();
                    if span > 0.0 {
                        (v.ln() - low.ln()) / span
                    } else {
                        0.5
                    }
                }
                (ParameterKind::Choice { values }, ParameterValue::Json(v)) => {
                    let idx = values.iter().position(|c| c == v).ok_or_else(invalid)?;
                    if values.len() > 1 {
                        idx as f64 / (values.len() - 1) as f64
                    } else {
                        0.0
                    }
                }
                (ParameterKind::Constant { .. }, _) => 0.0,
                _ => return Err(invalid().into()),
            };
            out.push(encoded);
        }
        Ok(out)
    }
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

/// Dimension counts by parameter type, used for strategy auto-selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DimensionCounts {
    pub continuous: usize,
    pub categorical: usize,
    pub other: usize,
}

impl DimensionCounts {
    pub fn total(&self) -> usize {
        self.continuous + self.categorical + self.other
    }
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::FloatRange { low, high },
        });
        self
    }

    pub fn add_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::IntRange { low, high },
        });
        self
    }

    pub fn add_log_uniform(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::LogUniform { low, high },
        });
        self
    }

    pub fn add_choice(mut self, name: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Choice { values },
        });
        self
    }

    pub fn add_constant(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Constant { value },
        });
        self
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Counts of continuous / categorical / other dimensions.
    pub fn kind_counts(&self) -> DimensionCounts {
        let mut counts = DimensionCounts::default();
        for param in &self.parameters {
            match &param.kind {
                ParameterKind::FloatRange { .. }
                | ParameterKind::IntRange { .. }
                | ParameterKind::LogUniform { .. } => counts.continuous += 1,
                ParameterKind::Choice { .. } => counts.categorical += 1,
                ParameterKind::Constant { .. } => counts.other += 1,
            }
        }
        counts
    }

    /// The space's default configuration: range midpoints, geometric mean for
    /// log-uniform ranges, first choice, the constant value.
    pub fn default_configuration(&self) -> Configuration {
        let values = self
            .parameters
            .iter()
            .map(|param| match &param.kind {
                ParameterKind::FloatRange { low, high } => {
                    ParameterValue::Float((low + high) / 2.0)
                }
                ParameterKind::IntRange { low, high } => ParameterValue::Int((low + high) / 2),
                ParameterKind::LogUniform { low, high } => {
                    ParameterValue::Float(((low.ln() + high.ln()) / 2.0).exp())
                }
                ParameterKind::Choice { values } => ParameterValue::Json(values[0].clone()),
                ParameterKind::Constant { value } => ParameterValue::Json(value.clone()),
            })
            .collect();
        Configuration::new(values)
    }

    /// Check a configuration against the space: dimension count, value kinds
    /// and ranges.
    pub fn is_valid(&self, config: &Configuration) -> bool {
        if config.values.len() != self.parameters.len() {
            return false;
        }
        self.parameters
            .iter()
            .zip(&config.values)
            .all(|(param, value)| match (&param.kind, value) {
                (ParameterKind::FloatRange { low, high }, ParameterValue::Float(v)) => {
                    v >= low && v <= high
                }
                (ParameterKind::IntRange { low, high }, ParameterValue::Int(v)) => {
                    v >= low && v <= high
                }
                (ParameterKind::LogUniform { low, high }, ParameterValue::Float(v)) => {
                    v >= low && v <= high
                }
                (ParameterKind::Choice { values }, ParameterValue::Json(v)) => values.contains(v),
                (ParameterKind::Constant { value }, ParameterValue::Json(v)) => value == v,
                _ => false,
            })
    }

    /// Sample one random configuration.
    pub fn sample_one(&self, rng: &mut dyn RngCore) -> Configuration {
        let values = self
            .parameters
            .iter()
            .map(|param| match &param.kind {
                ParameterKind::FloatRange { low, high } => {
                    ParameterValue::Float(rng.random_range(*low..=*high))
                }
                ParameterKind::IntRange { low, high } => {
                    ParameterValue::Int(rng.random_range(*low..=*high))
                }
                ParameterKind::LogUniform { low, high } => {
                    let log_val: f64 = rng.random_range(low.ln()..=high.ln());
                    ParameterValue::Float(log_val.exp())
                }
                ParameterKind::Choice { values } => {
                    let idx = rng.random_range(0..values.len());
                    ParameterValue::Json(values[idx].clone())
                }
                ParameterKind::Constant { value } => ParameterValue::Json(value.clone()),
            })
            .collect();
        Configuration::new(values)
    }

    /// Sample `n` random configurations, avoiding `excluded` and internal
    /// duplicates. After a bounded number of retries a duplicate is accepted
    /// rather than looping forever (an all-constant space has one point).
    pub fn sample_random(
        &self,
        n: usize,
        excluded: &[Configuration],
        rng: &mut dyn RngCore,
    ) -> Vec<Configuration> {
        const MAX_RETRIES: usize = 100;

        let mut sampled: Vec<Configuration> = Vec::with_capacity(n);
        for _ in 0..n {
            let mut candidate = self.sample_one(rng);
            let mut retries = 0;
            while retries < MAX_RETRIES
                && (candidate.is_in(excluded) || candidate.is_in(&sampled))
            {
                candidate = self.sample_one(rng);
                retries += 1;
            }
            sampled.push(candidate);
        }
        sampled
    }

    /// Decode a unit-cube point into a configuration (inverse of
    /// [`Configuration::to_unit_vector`], up to rounding on discrete
    /// dimensions). Coordinates are clamped to [0, 1] first.
    pub fn from_unit_vector(&self, point: &[f64]) -> SableResult<Configuration> {
        if point.len() != self.parameters.len() {
            return Err(SpaceError::DimensionMismatch {
                got: point.len(),
                expected: self.parameters.len(),
            }
            .into());
        }

        let values = self
            .parameters
            .iter()
            .zip(point)
            .map(|(param, &t)| {
                let t = t.clamp(0.0, 1.0);
                match &param.kind {
                    ParameterKind::FloatRange { low, high } => {
                        ParameterValue::Float(low + t * (high - low))
                    }
                    ParameterKind::IntRange { low, high } => {
                        let v = *low as f64 + t * (high - low) as f64;
                        ParameterValue::Int((v.round() as i64).clamp(*low, *high))
                    }
                    ParameterKind::LogUniform { low, high } => {
                        ParameterValue::Float((low.ln() + t * (high.ln() - low.ln())).exp())
                    }
                    ParameterKind::Choice { values } => {
                        let idx = ((t * values.len() as f64) as usize).min(values.len() - 1);
                        ParameterValue::Json(values[idx].clone())
                    }
                    ParameterKind::Constant { value } => ParameterValue::Json(value.clone()),
                }
            })
            .collect();
        Ok(Configuration::new(values))
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_space() -> SearchSpace {
        SearchSpace::new()
            .add_int("short_period", 5, 15)
            .add_float("position_size", 0.5, 1.0)
            .add_log_uniform("lr", 1e-5, 1e-1)
    }

    #[test]
    fn search_space_builder_chain() {
        let space = SearchSpace::new()
            .add_int("a", 1, 10)
            .add_float("b", 0.0, 1.0)
            .add_log_uniform("c", 0.001, 100.0)
            .add_choice("d", vec![serde_json::json!(true), serde_json::json!(false)])
            .add_constant("e", serde_json::json!("fixed"));
        assert_eq!(space.len(), 5);

        let counts = space.kind_counts();
        assert_eq!(counts.continuous, 3);
        assert_eq!(counts.categorical, 1);
        assert_eq!(counts.other, 1);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn random_samples_respect_bounds() {
        let space = sample_space();
        let mut rng = rand::rng();
        for _ in 0..50 {
            let config = space.sample_one(&mut rng);
            assert!(space.is_valid(&config));
            match config.values[0] {
                ParameterValue::Int(v) => assert!((5..=15).contains(&v)),
                ref other => panic!("unexpected short_period value: {other:?}"),
            }
        }
    }

    #[test]
    fn default_configuration_is_valid() {
        let space = sample_space().add_choice(
            "kind",
            vec![serde_json::json!("a"), serde_json::json!("b")],
        );
        let default = space.default_configuration();
        assert!(space.is_valid(&default));
        assert_eq!(
            default.values[3],
            ParameterValue::Json(serde_json::json!("a"))
        );
    }

    #[test]
    fn unit_vector_round_trip() {
        let space = sample_space();
        let mut rng = rand::rng();
        for _ in 0..20 {
            let config = space.sample_one(&mut rng);
            let encoded = config.to_unit_vector(&space).unwrap();
            assert_eq!(encoded.len(), 3);
            assert!(encoded.iter().all(|v| (0.0..=1.0).contains(v)));

            let decoded = space.from_unit_vector(&encoded).unwrap();
            assert!(space.is_valid(&decoded));
        }
    }

    #[test]
    fn sampling_avoids_excluded_configs() {
        let space = SearchSpace::new().add_int("x", 0, 5);
        let mut rng = rand::rng();
        let excluded: Vec<Configuration> = (0..5)
            .map(|i| Configuration::new(vec![ParameterValue::Int(i)]))
            .collect();

        for _ in 0..20 {
            let sampled = space.sample_random(1, &excluded, &mut rng);
            assert_eq!(sampled[0], Configuration::new(vec![ParameterValue::Int(5)]));
        }
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let space = sample_space();
        let config = Configuration::new(vec![ParameterValue::Int(7)]);
        assert!(!space.is_valid(&config));
        assert!(config.to_unit_vector(&space).is_err());
    }

    #[test]
    fn membership_uses_value_equality() {
        let a = Configuration::new(vec![ParameterValue::Int(1), ParameterValue::Float(0.5)]);
        let b = Configuration::new(vec![ParameterValue::Int(1), ParameterValue::Float(0.5)]);
        let c = Configuration::new(vec![ParameterValue::Int(2), ParameterValue::Float(0.5)]);
        assert!(a.is_in(&[b]));
        assert!(!a.is_in(&[c]));
    }
}
