//! The optimization advisor: strategy auto-selection, setup validation, the
//! one-shot model swap, and the per-call suggestion state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sable_models::{
    build_acq_optimizer, build_acquisition, build_regressor, hypercell_bounds, Acquisition,
    AcquisitionContext, AcquisitionKind, AcquisitionOptimizer, OptimizerKind, PointEstimate,
    Regressor, ScalarizedRegressor, SurrogateKind, TransferBase,
};
use sable_types::{
    Configuration, ConstraintTransform, DimensionCounts, History, ObjectiveTransform,
    SableResult, SearchSpace, SetupError, SourceTask,
};

use crate::design::{create_initial_design, InitStrategy};
use crate::ensemble::EnsembleSurrogate;
use crate::observer::{Observer, TracingObserver};

/// Acquisition-function evaluations granted to the optimizer per suggestion.
const ACQ_SEARCH_BUDGET: usize = 5000;
/// Observation count at which an auto-chosen smooth surrogate is swapped for
/// the robust one.
const MODEL_SWAP_THRESHOLD: usize = 300;
/// Dimensionality at which Bayesian optimization is abandoned for random
/// search.
const RANDOM_SEARCH_DIMS: usize = 100;
/// Dimensionality from which the robust surrogate is preferred.
const ROBUST_DIMS: usize = 10;
/// Objective count above which the entropy-search family takes over from the
/// hypervolume family.
const MAX_HYPERVOLUME_OBJECTIVES: usize = 4;

/// Overall search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Surrogate-driven Bayesian optimization.
    Bayesian,
    /// Pure random search; all surrogate machinery is bypassed.
    Random,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bayesian => write!(f, "bo"),
            Self::Random => write!(f, "random"),
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bo" => Ok(Self::Bayesian),
            "random" => Ok(Self::Random),
            other => Err(SetupError::UnsupportedOption {
                field: "strategy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Top-level configuration for an advisor.
///
/// `surrogate`, `acquisition` and `acq_optimizer` left as `None` are
/// auto-selected from the problem shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    pub id: Uuid,
    pub name: String,
    pub space: SearchSpace,
    pub num_objectives: usize,
    pub num_constraints: usize,
    pub mode: SearchMode,
    pub initial_trials: usize,
    pub init_strategy: InitStrategyConfig,
    pub initial_configurations: Option<Vec<Configuration>>,
    /// Probability of a pure-exploration random draw per suggestion.
    pub rand_prob: f64,
    pub surrogate: Option<SurrogateKind>,
    pub acquisition: Option<AcquisitionKind>,
    pub acq_optimizer: Option<OptimizerKind>,
    /// Required by the hypervolume acquisition family.
    pub ref_point: Option<Vec<f64>>,
    pub source_tasks: Vec<SourceTask>,
    pub random_state: u64,
    pub created_at: DateTime<Utc>,
}

/// Serializable stand-in for [`InitStrategy`] inside the config record.
pub type InitStrategyConfig = String;

impl AdvisorConfig {
    pub fn new(name: impl Into<String>, space: SearchSpace) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            space,
            num_objectives: 1,
            num_constraints: 0,
            mode: SearchMode::Bayesian,
            initial_trials: 3,
            init_strategy: "random_explore_first".to_string(),
            initial_configurations: None,
            rand_prob: 0.1,
            surrogate: None,
            acquisition: None,
            acq_optimizer: None,
            ref_point: None,
            source_tasks: Vec::new(),
            random_state: 1,
            created_at: Utc::now(),
        }
    }

    pub fn with_objectives(mut self, n: usize) -> Self {
        self.num_objectives = n;
        self
    }

    pub fn with_constraints(mut self, n: usize) -> Self {
        self.num_constraints = n;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_initial_trials(mut self, n: usize) -> Self {
        self.initial_trials = n;
        self
    }

    pub fn with_init_strategy(mut self, strategy: &str) -> Self {
        self.init_strategy = strategy.to_string();
        self
    }

    pub fn with_initial_configurations(mut self, configs: Vec<Configuration>) -> Self {
        self.initial_configurations = Some(configs);
        self
    }

    pub fn with_rand_prob(mut self, p: f64) -> Self {
        self.rand_prob = p;
        self
    }

    pub fn with_surrogate(mut self, kind: SurrogateKind) -> Self {
        self.surrogate = Some(kind);
        self
    }

    pub fn with_acquisition(mut self, kind: AcquisitionKind) -> Self {
        self.acquisition = Some(kind);
        self
    }

    pub fn with_acq_optimizer(mut self, kind: OptimizerKind) -> Self {
        self.acq_optimizer = Some(kind);
        self
    }

    pub fn with_ref_point(mut self, point: Vec<f64>) -> Self {
        self.ref_point = Some(point);
        self
    }

    pub fn with_source_tasks(mut self, tasks: Vec<SourceTask>) -> Self {
        self.source_tasks = tasks;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// The declarative strategy resolved from problem shape and user overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyKnobs {
    pub mode: SearchMode,
    pub surrogate: SurrogateKind,
    pub constraint_surrogate: Option<SurrogateKind>,
    pub acquisition: AcquisitionKind,
    pub optimizer: OptimizerKind,
    /// Set only when the surrogate was auto-chosen and no transfer history
    /// is present; gates the one-shot model swap.
    pub auto_alter: bool,
}

/// Pure strategy selection from problem shape. Side-effect free; the advisor
/// applies the result.
#[allow(clippy::too_many_arguments)]
pub fn auto_select(
    counts: DimensionCounts,
    num_objectives: usize,
    num_constraints: usize,
    has_transfer: bool,
    mode: SearchMode,
    user_surrogate: Option<SurrogateKind>,
    user_acquisition: Option<AcquisitionKind>,
    user_optimizer: Option<OptimizerKind>,
) -> StrategyKnobs {
    let mut mode = mode;
    let mut auto_alter = false;

    let mut surrogate = match user_surrogate {
        Some(kind) => kind,
        None => {
            auto_alter = !has_transfer;
            if counts.total() >= RANDOM_SEARCH_DIMS {
                mode = SearchMode::Random;
                SurrogateKind::Robust
            } else if counts.total() >= ROBUST_DIMS || counts.categorical > counts.continuous {
                if has_transfer {
                    SurrogateKind::Transfer {
                        base: TransferBase::Robust,
                    }
                } else {
                    SurrogateKind::Robust
                }
            } else if has_transfer {
                SurrogateKind::Transfer {
                    base: TransferBase::Smooth,
                }
            } else {
                SurrogateKind::smooth()
            }
        }
    };

    let acquisition = match user_acquisition {
        Some(kind) => kind,
        None => match (num_objectives, num_constraints) {
            (1, 0) => AcquisitionKind::Ei,
            (1, _) => AcquisitionKind::Eic,
            (m, 0) if m <= MAX_HYPERVOLUME_OBJECTIVES => AcquisitionKind::Ehvi,
            (m, _) if m <= MAX_HYPERVOLUME_OBJECTIVES => AcquisitionKind::Ehvic,
            (_, 0) => AcquisitionKind::Mesmo,
            (_, _) => AcquisitionKind::Mesmoc,
        },
    };

    // The entropy-search family only works with the RBF smooth surrogate,
    // whatever the dimension rule said.
    if acquisition.is_entropy_search() {
        surrogate = SurrogateKind::smooth_rbf();
        auto_alter = false;
    }

    let mut optimizer = match user_optimizer {
        Some(kind) => kind,
        None => {
            if counts.categorical + counts.other == 0 {
                OptimizerKind::RandomRestart
            } else {
                OptimizerKind::LocalRandom
            }
        }
    };
    if acquisition.is_entropy_search() {
        optimizer = OptimizerKind::BatchSampling;
    }

    let constraint_surrogate = if num_constraints > 0 {
        if acquisition == AcquisitionKind::Mesmoc {
            Some(SurrogateKind::smooth_rbf())
        } else {
            Some(SurrogateKind::smooth())
        }
    } else {
        None
    };

    StrategyKnobs {
        mode,
        surrogate,
        constraint_surrogate,
        acquisition,
        optimizer,
        auto_alter,
    }
}

/// The objective model owned by the advisor for the current strategy.
enum ObjectiveModel {
    Single(Box<dyn Regressor>),
    Ensemble(EnsembleSurrogate),
    PerObjective(Vec<Box<dyn Regressor>>),
    Scalarized(ScalarizedRegressor),
}

/// Sequential decision engine: proposes the next configuration(s) to
/// evaluate from the observation history.
pub struct OptimizationAdvisor {
    config: AdvisorConfig,
    knobs: StrategyKnobs,
    initial_design: Vec<Configuration>,
    rng: StdRng,
    observer: Arc<dyn Observer>,
    model: ObjectiveModel,
    constraint_models: Vec<Box<dyn Regressor>>,
    acquisition: Box<dyn Acquisition>,
    acq_optimizer: Box<dyn AcquisitionOptimizer>,
}

impl std::fmt::Debug for OptimizationAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizationAdvisor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OptimizationAdvisor {
    pub fn new(config: AdvisorConfig) -> SableResult<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        config: AdvisorConfig,
        observer: Arc<dyn Observer>,
    ) -> SableResult<Self> {
        let knobs = auto_select(
            config.space.kind_counts(),
            config.num_objectives,
            config.num_constraints,
            !config.source_tasks.is_empty(),
            config.mode,
            config.surrogate,
            config.acquisition,
            config.acq_optimizer,
        );
        check_setup(&knobs, &config)?;

        observer.inform(&format!(
            "advisor setup: mode={} surrogate={} acquisition={} optimizer={}",
            knobs.mode, knobs.surrogate, knobs.acquisition, knobs.optimizer
        ));

        let mut rng = StdRng::seed_from_u64(config.random_state);
        let initial_design = match &config.initial_configurations {
            Some(configs) if !configs.is_empty() => configs.clone(),
            _ => {
                let strategy: InitStrategy = config.init_strategy.parse()?;
                create_initial_design(
                    &config.space,
                    strategy,
                    config.initial_trials,
                    &mut rng,
                    observer.as_ref(),
                )?
            }
        };

        let mut advisor = Self {
            model: ObjectiveModel::Single(build_regressor(
                &SurrogateKind::smooth(),
                config.random_state,
            )),
            constraint_models: Vec::new(),
            acquisition: build_acquisition(knobs.acquisition),
            acq_optimizer: build_acq_optimizer(knobs.optimizer),
            config,
            knobs,
            initial_design,
            rng,
            observer,
        };
        advisor.setup_components();
        Ok(advisor)
    }

    /// The resolved strategy knobs.
    pub fn knobs(&self) -> &StrategyKnobs {
        &self.knobs
    }

    pub fn initial_design(&self) -> &[Configuration] {
        &self.initial_design
    }

    /// Weight history of the transfer ensemble, if one is active.
    pub fn ensemble_weight_history(&self) -> Option<&[Vec<f64>]> {
        match &self.model {
            ObjectiveModel::Ensemble(ensemble) => Some(ensemble.weight_history()),
            _ => None,
        }
    }

    /// Replace the transfer-learning source tasks and refit all source
    /// regressors from scratch. No-op for non-transfer strategies.
    pub fn update_source_tasks(&mut self, tasks: Vec<SourceTask>) {
        if let ObjectiveModel::Ensemble(ensemble) = &mut self.model {
            ensemble.update_trials(&tasks);
        }
        self.config.source_tasks = tasks;
    }

    /// (Re)build model, constraint models, acquisition and optimizer from the
    /// current knobs.
    fn setup_components(&mut self) {
        let seed = self.config.random_state;

        self.model = if self.knobs.surrogate.is_transfer() {
            ObjectiveModel::Ensemble(EnsembleSurrogate::new(
                self.knobs.surrogate,
                &self.config.source_tasks,
                seed,
            ))
        } else if self.config.num_objectives == 1 {
            ObjectiveModel::Single(build_regressor(&self.knobs.surrogate, seed))
        } else if self.knobs.acquisition.is_scalarized() {
            ObjectiveModel::Scalarized(ScalarizedRegressor::new(
                build_regressor(&self.knobs.surrogate, seed),
                self.config.num_objectives,
                seed,
            ))
        } else {
            ObjectiveModel::PerObjective(
                (0..self.config.num_objectives)
                    .map(|i| build_regressor(&self.knobs.surrogate, seed.wrapping_add(i as u64)))
                    .collect(),
            )
        };

        self.constraint_models = match self.knobs.constraint_surrogate {
            Some(kind) => (0..self.config.num_constraints)
                .map(|i| build_regressor(&kind, seed.wrapping_add(100 + i as u64)))
                .collect(),
            None => Vec::new(),
        };

        self.acquisition = build_acquisition(self.knobs.acquisition);
        self.acq_optimizer = build_acq_optimizer(self.knobs.optimizer);
    }

    /// One-shot model swap: once enough observations have accumulated, an
    /// auto-chosen smooth surrogate is replaced by the robust one (and the
    /// continuous-restart optimizer by the interleaved one).
    fn alter_model(&mut self, history: &History) {
        if !self.knobs.auto_alter {
            return;
        }
        let num_evaluated = history.len();
        if num_evaluated < MODEL_SWAP_THRESHOLD {
            return;
        }
        if self.knobs.surrogate != SurrogateKind::smooth() {
            return;
        }

        self.knobs.surrogate = SurrogateKind::Robust;
        self.observer.inform(&format!(
            "n_observations={num_evaluated}, switching surrogate from smooth to robust"
        ));
        if self.knobs.optimizer == OptimizerKind::RandomRestart {
            self.knobs.optimizer = OptimizerKind::LocalRandom;
            self.observer.inform(&format!(
                "n_observations={num_evaluated}, switching acquisition optimizer from \
                 random-restart to local-random"
            ));
        }
        self.setup_components();
    }

    fn random_unseen(&mut self, history: &History) -> Configuration {
        let evaluated = history.configurations();
        self.config
            .space
            .sample_random(1, &evaluated, &mut self.rng)
            .remove(0)
    }

    /// Generate one configuration for this query.
    pub fn get_suggestion(&mut self, history: &History) -> SableResult<Configuration> {
        let mut suggestions = self.suggest(history, false)?;
        Ok(suggestions.remove(0))
    }

    /// Generate a ranked batch of candidate configurations. The batch skips
    /// the pure-exploration draw and may contain configurations already in
    /// the history; the caller filters duplicates itself.
    pub fn get_suggestions(&mut self, history: &History) -> SableResult<Vec<Configuration>> {
        self.suggest(history, true)
    }

    fn suggest(
        &mut self,
        history: &History,
        return_list: bool,
    ) -> SableResult<Vec<Configuration>> {
        self.alter_model(history);

        let num_evaluated = history.len();
        let num_successful = history.success_count();

        if num_evaluated < self.initial_design.len() {
            return Ok(vec![self.initial_design[num_evaluated].clone()]);
        }

        if self.knobs.mode == SearchMode::Random {
            return Ok(vec![self.random_unseen(history)]);
        }

        if !return_list && self.rng.random::<f64>() < self.config.rand_prob {
            self.observer.inform(&format!(
                "sampling random configuration, rand_prob={}",
                self.config.rand_prob
            ));
            return Ok(vec![self.random_unseen(history)]);
        }

        if num_successful < self.initial_design.len().max(1) {
            self.observer.warning(
                "not enough successful initial trials; sampling random configuration",
            );
            return Ok(vec![self.random_unseen(history)]);
        }

        let x = history.config_array(&self.config.space)?;
        let y = history.objectives(ObjectiveTransform::FailedAsWorst);
        let cy = history.constraints(ConstraintTransform::Bilog);

        self.train_models(&x, &y, &cy)?;
        let ctx = self.acquisition_context(history, &y, &cy)?;
        self.acquisition.update(ctx)?;

        let candidates = self.optimize_acquisition(history);

        if return_list {
            return Ok(candidates);
        }

        for candidate in candidates {
            if !history.contains(&candidate) {
                return Ok(vec![candidate]);
            }
        }
        self.observer.warning(
            "no non-duplicate configuration among acquisition candidates; \
             sampling random configuration",
        );
        Ok(vec![self.random_unseen(history)])
    }

    fn train_models(
        &mut self,
        x: &[Vec<f64>],
        y: &[Vec<f64>],
        cy: &[Vec<f64>],
    ) -> SableResult<()> {
        match &mut self.model {
            ObjectiveModel::Single(model) => model.fit(x, &column(y, 0)),
            ObjectiveModel::Ensemble(ensemble) => {
                ensemble.train(x, &column(y, 0), self.observer.as_ref())?
            }
            ObjectiveModel::Scalarized(model) => model.fit_multi(x, y),
            ObjectiveModel::PerObjective(models) => {
                for (i, model) in models.iter_mut().enumerate() {
                    model.fit(x, &column(y, i));
                }
            }
        }

        for (i, model) in self.constraint_models.iter_mut().enumerate() {
            model.fit(x, &column(cy, i));
        }
        Ok(())
    }

    fn acquisition_context(
        &self,
        history: &History,
        y: &[Vec<f64>],
        cy: &[Vec<f64>],
    ) -> SableResult<AcquisitionContext> {
        let num_data = history.len();
        let kind = self.knobs.acquisition;

        let ctx = if self.config.num_objectives == 1 {
            AcquisitionContext {
                num_data,
                incumbent: history.incumbent_value(),
                ..Default::default()
            }
        } else if kind.is_scalarized() {
            let incumbent = match &self.model {
                ObjectiveModel::Scalarized(model) => {
                    model.scalarize(&history.mo_incumbent_values())
                }
                _ => {
                    return Err(sable_types::internal_error!(
                        "scalarized acquisition without a scalarized model"
                    ))
                }
            };
            AcquisitionContext {
                num_data,
                incumbent: Some(incumbent),
                ..Default::default()
            }
        } else if kind.is_hypervolume() {
            // Validated at setup; the reference point is always present here.
            let ref_point = self.config.ref_point.as_ref().ok_or_else(|| {
                SetupError::MissingReferencePoint
            })?;
            AcquisitionContext {
                num_data,
                cell_bounds: Some(hypercell_bounds(y, ref_point)?),
                ..Default::default()
            }
        } else {
            AcquisitionContext {
                num_data,
                mo_incumbents: history.mo_incumbent_values(),
                constraint_perfs: cy.to_vec(),
                ..Default::default()
            }
        };
        Ok(ctx)
    }

    fn optimize_acquisition(&mut self, history: &History) -> Vec<Configuration> {
        let space = &self.config.space;
        let model = &self.model;
        let constraint_models = &self.constraint_models;
        let acquisition = &self.acquisition;

        let score = |config: &Configuration| -> f64 {
            let Ok(point) = config.to_unit_vector(space) else {
                return f64::NEG_INFINITY;
            };
            let row = std::slice::from_ref(&point);

            let objectives: Vec<PointEstimate> = match model {
                ObjectiveModel::Single(m) => {
                    let (mu, var) = m.predict(row);
                    vec![PointEstimate::new(mu[0], var[0])]
                }
                ObjectiveModel::Ensemble(ensemble) => {
                    let (mu, var) = ensemble.predict(row);
                    vec![PointEstimate::new(mu[0], var[0])]
                }
                ObjectiveModel::Scalarized(m) => {
                    let (mu, var) = m.predict(row);
                    vec![PointEstimate::new(mu[0], var[0])]
                }
                ObjectiveModel::PerObjective(models) => models
                    .iter()
                    .map(|m| {
                        let (mu, var) = m.predict(row);
                        PointEstimate::new(mu[0], var[0])
                    })
                    .collect(),
            };
            let constraints: Vec<PointEstimate> = constraint_models
                .iter()
                .map(|m| {
                    let (mu, var) = m.predict(row);
                    PointEstimate::new(mu[0], var[0])
                })
                .collect();

            acquisition.score(&objectives, &constraints)
        };

        self.acq_optimizer
            .maximize(&score, space, history, ACQ_SEARCH_BUDGET, &mut self.rng)
    }
}

/// Validate the resolved strategy against the problem description. All
/// violations here are fatal configuration errors.
fn check_setup(knobs: &StrategyKnobs, config: &AdvisorConfig) -> SableResult<()> {
    if config.num_objectives < 1 {
        return Err(SetupError::InvalidCounts {
            message: "num_objectives must be at least 1".to_string(),
        }
        .into());
    }

    if !knobs
        .acquisition
        .is_legal_for(config.num_objectives, config.num_constraints)
    {
        return Err(SetupError::IllegalAcquisition {
            acquisition: knobs.acquisition.to_string(),
            num_objectives: config.num_objectives,
            num_constraints: config.num_constraints,
        }
        .into());
    }

    if knobs.acquisition.is_hypervolume() {
        match &config.ref_point {
            None => return Err(SetupError::MissingReferencePoint.into()),
            Some(point) if point.len() != config.num_objectives => {
                return Err(SetupError::ReferencePointDimension {
                    got: point.len(),
                    expected: config.num_objectives,
                }
                .into())
            }
            Some(_) => {}
        }
    }

    if !config.source_tasks.is_empty() {
        if config.num_objectives != 1 || config.num_constraints != 0 {
            return Err(SetupError::TransferUnsupported {
                num_objectives: config.num_objectives,
                num_constraints: config.num_constraints,
            }
            .into());
        }
        if !knobs.surrogate.is_transfer() {
            return Err(SetupError::TransferKindMismatch {
                surrogate: knobs.surrogate.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Extract column `i` from row-major data.
fn column(rows: &[Vec<f64>], i: usize) -> Vec<f64> {
    rows.iter().map(|row| row[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CapturingObserver;
    use sable_types::{Observation, ParameterValue, SableError};

    fn small_space() -> SearchSpace {
        SearchSpace::new()
            .add_float("x", 0.0, 1.0)
            .add_float("y", 0.0, 1.0)
    }

    fn wide_space(dims: usize) -> SearchSpace {
        let mut space = SearchSpace::new();
        for i in 0..dims {
            space = space.add_float(format!("x{i}"), 0.0, 1.0);
        }
        space
    }

    fn observe(history: &mut History, advisor: &mut OptimizationAdvisor, value: f64) {
        let config = advisor.get_suggestion(history).unwrap();
        history.push(Observation::success(config, vec![value], vec![]));
    }

    #[test]
    fn auto_select_low_dims_is_smooth_ei() {
        let knobs = auto_select(
            small_space().kind_counts(),
            1,
            0,
            false,
            SearchMode::Bayesian,
            None,
            None,
            None,
        );
        assert_eq!(knobs.surrogate, SurrogateKind::smooth());
        assert_eq!(knobs.acquisition, AcquisitionKind::Ei);
        assert_eq!(knobs.optimizer, OptimizerKind::RandomRestart);
        assert!(knobs.auto_alter);
        assert_eq!(knobs.mode, SearchMode::Bayesian);
    }

    #[test]
    fn auto_select_high_dims_degrades_to_random_search() {
        let knobs = auto_select(
            wide_space(120).kind_counts(),
            1,
            0,
            false,
            SearchMode::Bayesian,
            None,
            None,
            None,
        );
        assert_eq!(knobs.mode, SearchMode::Random);
    }

    #[test]
    fn auto_select_categorical_majority_prefers_robust() {
        let space = SearchSpace::new()
            .add_float("x", 0.0, 1.0)
            .add_choice("a", vec![serde_json::json!(1), serde_json::json!(2)])
            .add_choice("b", vec![serde_json::json!(1), serde_json::json!(2)]);
        let knobs = auto_select(
            space.kind_counts(),
            1,
            0,
            false,
            SearchMode::Bayesian,
            None,
            None,
            None,
        );
        assert_eq!(knobs.surrogate, SurrogateKind::Robust);
        assert_eq!(knobs.optimizer, OptimizerKind::LocalRandom);
    }

    #[test]
    fn auto_select_transfer_history_picks_transfer_variant() {
        let knobs = auto_select(
            small_space().kind_counts(),
            1,
            0,
            true,
            SearchMode::Bayesian,
            None,
            None,
            None,
        );
        assert_eq!(
            knobs.surrogate,
            SurrogateKind::Transfer {
                base: TransferBase::Smooth
            }
        );
        assert!(!knobs.auto_alter);
    }

    #[test]
    fn auto_select_many_objectives_forces_entropy_family_and_rbf() {
        let knobs = auto_select(
            small_space().kind_counts(),
            5,
            0,
            false,
            SearchMode::Bayesian,
            None,
            None,
            None,
        );
        assert_eq!(knobs.acquisition, AcquisitionKind::Mesmo);
        assert_eq!(knobs.surrogate, SurrogateKind::smooth_rbf());
        assert_eq!(knobs.optimizer, OptimizerKind::BatchSampling);

        let constrained = auto_select(
            small_space().kind_counts(),
            5,
            2,
            false,
            SearchMode::Bayesian,
            None,
            None,
            None,
        );
        assert_eq!(constrained.acquisition, AcquisitionKind::Mesmoc);
        assert_eq!(
            constrained.constraint_surrogate,
            Some(SurrogateKind::smooth_rbf())
        );
    }

    #[test]
    fn hypervolume_without_ref_point_is_fatal() {
        let config = AdvisorConfig::new("test", small_space()).with_objectives(2);
        let err = OptimizationAdvisor::new(config).unwrap_err();
        assert!(matches!(
            err,
            SableError::Setup(SetupError::MissingReferencePoint)
        ));

        let config = AdvisorConfig::new("test", small_space())
            .with_objectives(2)
            .with_ref_point(vec![10.0, 10.0]);
        assert!(OptimizationAdvisor::new(config).is_ok());
    }

    #[test]
    fn transfer_learning_is_single_objective_unconstrained_only() {
        let task = SourceTask::new(vec![vec![0.0], vec![1.0]], vec![0.0, 1.0]);

        let config = AdvisorConfig::new("test", small_space())
            .with_objectives(2)
            .with_ref_point(vec![10.0, 10.0])
            .with_source_tasks(vec![task.clone()]);
        let err = OptimizationAdvisor::new(config).unwrap_err();
        assert!(matches!(
            err,
            SableError::Setup(SetupError::TransferUnsupported { .. })
        ));

        // Forcing a non-transfer surrogate alongside history is also fatal.
        let config = AdvisorConfig::new("test", small_space())
            .with_surrogate(SurrogateKind::smooth())
            .with_source_tasks(vec![task]);
        let err = OptimizationAdvisor::new(config).unwrap_err();
        assert!(matches!(
            err,
            SableError::Setup(SetupError::TransferKindMismatch { .. })
        ));
    }

    #[test]
    fn illegal_acquisition_for_problem_shape_is_fatal() {
        let config = AdvisorConfig::new("test", small_space())
            .with_constraints(1)
            .with_acquisition(AcquisitionKind::Ei);
        let err = OptimizationAdvisor::new(config).unwrap_err();
        assert!(matches!(
            err,
            SableError::Setup(SetupError::IllegalAcquisition { .. })
        ));
    }

    #[test]
    fn initial_design_is_replayed_in_order() {
        let config = AdvisorConfig::new("test", small_space()).with_initial_trials(4);
        let mut advisor = OptimizationAdvisor::new(config).unwrap();
        let design = advisor.initial_design().to_vec();
        assert_eq!(design.len(), 4);

        let mut history = History::new();
        for expected in &design {
            let suggested = advisor.get_suggestion(&history).unwrap();
            assert_eq!(&suggested, expected);
            history.push(Observation::success(suggested, vec![0.5], vec![]));
        }
    }

    #[test]
    fn user_supplied_initial_configurations_replace_the_design() {
        let configs = vec![
            Configuration::new(vec![
                ParameterValue::Float(0.25),
                ParameterValue::Float(0.75),
            ]),
            Configuration::new(vec![
                ParameterValue::Float(0.5),
                ParameterValue::Float(0.5),
            ]),
        ];
        let config = AdvisorConfig::new("test", small_space())
            .with_initial_trials(7)
            .with_initial_configurations(configs.clone());
        let advisor = OptimizationAdvisor::new(config).unwrap();
        assert_eq!(advisor.initial_design(), configs.as_slice());
    }

    #[test]
    fn full_exploration_probability_never_fits_models() {
        let observer = Arc::new(CapturingObserver::new());
        let config = AdvisorConfig::new("test", small_space())
            .with_initial_trials(3)
            .with_rand_prob(1.0);
        let mut advisor =
            OptimizationAdvisor::with_observer(config, observer.clone()).unwrap();

        let mut history = History::new();
        for i in 0..8 {
            observe(&mut history, &mut advisor, 0.1 * i as f64);
        }

        // Every post-design call took the exploration branch.
        let rand_draws = observer
            .infos()
            .iter()
            .filter(|m| m.contains("rand_prob"))
            .count();
        assert_eq!(rand_draws, 5);
        // And none ever reached model training (the ensemble is the only
        // model that logs; absence of warnings shows no degraded path ran).
        assert!(observer.warnings().is_empty());
    }

    #[test]
    fn batch_mode_skips_the_exploration_draw() {
        let observer = Arc::new(CapturingObserver::new());
        let config = AdvisorConfig::new("test", small_space())
            .with_initial_trials(3)
            .with_rand_prob(0.0);
        let mut advisor =
            OptimizationAdvisor::with_observer(config, observer.clone()).unwrap();

        let mut history = History::new();
        for i in 0..4 {
            observe(&mut history, &mut advisor, 0.2 * i as f64);
        }

        let batch = advisor.get_suggestions(&history).unwrap();
        assert!(batch.len() > 1);
        assert!(observer
            .infos()
            .iter()
            .all(|m| !m.contains("rand_prob")));
    }

    #[test]
    fn insufficient_successes_degrade_to_random_with_warning() {
        let observer = Arc::new(CapturingObserver::new());
        let config = AdvisorConfig::new("test", small_space())
            .with_initial_trials(2)
            .with_rand_prob(0.0);
        let mut advisor =
            OptimizationAdvisor::with_observer(config, observer.clone()).unwrap();

        let mut history = History::new();
        for _ in 0..3 {
            let config = advisor.get_suggestion(&history).unwrap();
            history.push(Observation::failed(config));
        }

        let suggestion = advisor.get_suggestion(&history).unwrap();
        assert!(!history.contains(&suggestion));
        assert!(observer
            .warnings()
            .iter()
            .any(|m| m.contains("successful")));
    }

    #[test]
    fn duplicate_candidates_fall_back_to_random_with_warning() {
        // A single-point space: every acquisition candidate duplicates the
        // history, forcing the degradation path.
        let space = SearchSpace::new().add_choice("only", vec![serde_json::json!("a")]);
        let observer = Arc::new(CapturingObserver::new());
        let config = AdvisorConfig::new("test", space)
            .with_initial_trials(1)
            .with_rand_prob(0.0);
        let mut advisor =
            OptimizationAdvisor::with_observer(config, observer.clone()).unwrap();

        let mut history = History::new();
        let first = advisor.get_suggestion(&history).unwrap();
        history.push(Observation::success(first, vec![0.5], vec![]));

        let _ = advisor.get_suggestion(&history).unwrap();
        assert!(observer
            .warnings()
            .iter()
            .any(|m| m.contains("non-duplicate")));
    }

    #[test]
    fn model_swap_happens_exactly_once_at_threshold() {
        let observer = Arc::new(CapturingObserver::new());
        // rand_prob 1.0 keeps suggestions cheap; alter_model runs first
        // regardless of which branch serves the call.
        let config = AdvisorConfig::new("test", small_space())
            .with_initial_trials(3)
            .with_rand_prob(1.0);
        let mut advisor =
            OptimizationAdvisor::with_observer(config, observer.clone()).unwrap();
        assert!(advisor.knobs().auto_alter);
        assert_eq!(advisor.knobs().surrogate, SurrogateKind::smooth());

        let mut history = History::new();
        let mut rng = rand::rng();
        for i in 0..MODEL_SWAP_THRESHOLD {
            let config = advisor.config.space.sample_one(&mut rng);
            history.push(Observation::success(config, vec![i as f64], vec![]));
        }

        let _ = advisor.get_suggestion(&history).unwrap();
        assert_eq!(advisor.knobs().surrogate, SurrogateKind::Robust);
        assert_eq!(advisor.knobs().optimizer, OptimizerKind::LocalRandom);

        let swaps = || {
            observer
                .infos()
                .iter()
                .filter(|m| m.contains("switching surrogate"))
                .count()
        };
        assert_eq!(swaps(), 1);

        let _ = advisor.get_suggestion(&history).unwrap();
        assert_eq!(swaps(), 1);
    }

    #[test]
    fn bayesian_loop_improves_on_a_smooth_objective() {
        let config = AdvisorConfig::new("quadratic", small_space())
            .with_initial_trials(4)
            .with_rand_prob(0.0)
            .with_random_state(5);
        let mut advisor = OptimizationAdvisor::new(config).unwrap();

        let objective = |c: &Configuration| -> f64 {
            let v: Vec<f64> = c
                .values
                .iter()
                .map(|p| match p {
                    ParameterValue::Float(f) => *f,
                    _ => 0.0,
                })
                .collect();
            (v[0] - 0.3).powi(2) + (v[1] - 0.6).powi(2)
        };

        let mut history = History::new();
        for _ in 0..15 {
            let config = advisor.get_suggestion(&history).unwrap();
            let value = objective(&config);
            history.push(Observation::success(config, vec![value], vec![]));
        }

        let incumbent = history.incumbent_value().unwrap();
        assert!(incumbent < 0.15, "incumbent after 15 rounds: {incumbent}");
    }

    #[test]
    fn transfer_ensemble_records_weight_history() {
        let n = 30;
        let design: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64 / n as f64, 1.0 - i as f64 / n as f64])
            .collect();
        let objectives: Vec<f64> = design.iter().map(|r| (r[0] - 0.3).powi(2)).collect();
        let task = SourceTask::new(design, objectives);

        let config = AdvisorConfig::new("transfer", small_space())
            .with_initial_trials(3)
            .with_rand_prob(0.0)
            .with_source_tasks(vec![task]);
        let mut advisor = OptimizationAdvisor::new(config).unwrap();
        assert!(advisor.knobs().surrogate.is_transfer());

        let mut history = History::new();
        for _ in 0..8 {
            let config = advisor.get_suggestion(&history).unwrap();
            let value = config
                .to_unit_vector(&small_space())
                .map(|v| (v[0] - 0.3).powi(2))
                .unwrap();
            history.push(Observation::success(config, vec![value], vec![]));
        }

        let weight_history = advisor.ensemble_weight_history().unwrap();
        assert!(!weight_history.is_empty());
        for weights in weight_history {
            assert_eq!(weights.len(), 2);
            assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}
