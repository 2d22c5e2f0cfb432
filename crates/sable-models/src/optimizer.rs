//! The acquisition-optimizer capability: searches the configuration space
//! for points maximizing an acquisition score, returning an ordered
//! candidate list.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sable_types::{Configuration, History, SearchSpace};

/// Scores one configuration under the current acquisition state.
pub type ScoreFn<'a> = dyn Fn(&Configuration) -> f64 + 'a;

/// Returns candidate configurations ordered by descending acquisition score.
pub trait AcquisitionOptimizer: Send {
    fn maximize(
        &mut self,
        score: &ScoreFn,
        space: &SearchSpace,
        history: &History,
        num_points: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Configuration>;
}

/// Closed set of acquisition-optimizer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Multi-start adaptive coordinate descent; purely numeric spaces only.
    RandomRestart,
    /// Interleaved local search around incumbents and random sampling.
    LocalRandom,
    /// Scored random batch; the dedicated optimizer for the entropy-search
    /// acquisition family.
    BatchSampling,
}

impl std::fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RandomRestart => "random-restart",
            Self::LocalRandom => "local-random",
            Self::BatchSampling => "batch-sampling",
        };
        write!(f, "{name}")
    }
}

/// Factory lookup: one optimizer per kind.
pub fn build_acq_optimizer(kind: OptimizerKind) -> Box<dyn AcquisitionOptimizer> {
    match kind {
        OptimizerKind::RandomRestart => Box::new(RandomRestartOptimizer::default()),
        OptimizerKind::LocalRandom => Box::new(LocalRandomOptimizer::default()),
        OptimizerKind::BatchSampling => Box::new(BatchSamplingOptimizer),
    }
}

/// Sort scored candidates by descending score and strip the scores.
fn into_ranked(mut scored: Vec<(Configuration, f64)>) -> Vec<Configuration> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().map(|(config, _)| config).collect()
}

/// Unit-cube anchors for local search: the best successful configurations
/// in the history, by first objective.
fn incumbent_anchors(space: &SearchSpace, history: &History, limit: usize) -> Vec<Vec<f64>> {
    let mut successes: Vec<(&Configuration, f64)> = history
        .observations()
        .iter()
        .filter(|o| o.is_success())
        .map(|o| (&o.config, o.objectives[0]))
        .collect();
    successes.sort_by(|a, b| a.1.total_cmp(&b.1));

    successes
        .iter()
        .take(limit)
        .filter_map(|(config, _)| config.to_unit_vector(space).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Interleaved local and random search
// ---------------------------------------------------------------------------

/// Perturbs the best evaluated points at several scales and mixes the
/// resulting neighbourhood with uniform random samples.
pub struct LocalRandomOptimizer {
    num_anchors: usize,
    scales: Vec<f64>,
}

impl Default for LocalRandomOptimizer {
    fn default() -> Self {
        Self {
            num_anchors: 5,
            scales: vec![0.05, 0.1, 0.2],
        }
    }
}

impl LocalRandomOptimizer {
    fn perturb(
        &self,
        anchor: &[f64],
        scale: f64,
        space: &SearchSpace,
        rng: &mut dyn RngCore,
    ) -> Option<Configuration> {
        let point: Vec<f64> = anchor
            .iter()
            .map(|&t| {
                // Occasionally re-roll a coordinate entirely so categorical
                // dimensions can move between choices.
                if rng.random::<f64>() < 0.2 {
                    rng.random::<f64>()
                } else {
                    t + rng.random_range(-scale..=scale)
                }
            })
            .collect();
        space.from_unit_vector(&point).ok()
    }
}

impl AcquisitionOptimizer for LocalRandomOptimizer {
    fn maximize(
        &mut self,
        score: &ScoreFn,
        space: &SearchSpace,
        history: &History,
        num_points: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Configuration> {
        let anchors = incumbent_anchors(space, history, self.num_anchors);
        let local_budget = if anchors.is_empty() { 0 } else { num_points / 2 };
        let random_budget = num_points - local_budget;

        let mut scored: Vec<(Configuration, f64)> = Vec::with_capacity(num_points);

        let mut produced = 0;
        'local: loop {
            for anchor in &anchors {
                for &scale in &self.scales {
                    if produced >= local_budget {
                        break 'local;
                    }
                    if let Some(candidate) = self.perturb(anchor, scale, space, rng) {
                        let s = score(&candidate);
                        scored.push((candidate, s));
                    }
                    produced += 1;
                }
            }
            if anchors.is_empty() {
                break;
            }
        }

        for _ in 0..random_budget {
            let candidate = space.sample_one(rng);
            let s = score(&candidate);
            scored.push((candidate, s));
        }

        debug!(
            candidates = scored.len(),
            anchors = anchors.len(),
            "local-random search complete"
        );
        into_ranked(scored)
    }
}

// ---------------------------------------------------------------------------
// Multi-start coordinate descent
// ---------------------------------------------------------------------------

/// Coordinate descent in the unit cube from several starting points, with a
/// step size that halves whenever no axis move improves the score. A cheap
/// stand-in for gradient/restart continuous optimizers; only sensible when
/// every dimension is numeric.
pub struct RandomRestartOptimizer {
    num_restarts: usize,
    initial_step: f64,
    min_step: f64,
}

impl Default for RandomRestartOptimizer {
    fn default() -> Self {
        Self {
            num_restarts: 10,
            initial_step: 0.25,
            min_step: 0.01,
        }
    }
}

impl AcquisitionOptimizer for RandomRestartOptimizer {
    fn maximize(
        &mut self,
        score: &ScoreFn,
        space: &SearchSpace,
        history: &History,
        num_points: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Configuration> {
        let dim = space.len();
        let mut starts = incumbent_anchors(space, history, self.num_restarts / 2);
        while starts.len() < self.num_restarts {
            starts.push((0..dim).map(|_| rng.random::<f64>()).collect());
        }

        let budget_per_start = (num_points / starts.len()).max(2 * dim + 1);
        let mut scored: Vec<(Configuration, f64)> = Vec::new();

        let evaluate = |point: &[f64], scored: &mut Vec<(Configuration, f64)>| -> f64 {
            match space.from_unit_vector(point) {
                Ok(config) => {
                    let s = score(&config);
                    scored.push((config, s));
                    s
                }
                Err(_) => f64::NEG_INFINITY,
            }
        };

        for start in starts {
            let mut evaluations = 1;
            let mut current = start;
            let mut current_score = evaluate(&current, &mut scored);
            let mut step = self.initial_step;

            while step >= self.min_step && evaluations < budget_per_start {
                let mut best_move: Option<(usize, f64, f64)> = None;
                for axis in 0..dim {
                    for direction in [step, -step] {
                        if evaluations >= budget_per_start {
                            break;
                        }
                        let mut neighbor = current.clone();
                        neighbor[axis] = (neighbor[axis] + direction).clamp(0.0, 1.0);
                        let s = evaluate(&neighbor, &mut scored);
                        evaluations += 1;
                        if s > current_score
                            && best_move.map(|(_, _, bs)| s > bs).unwrap_or(true)
                        {
                            best_move = Some((axis, neighbor[axis], s));
                        }
                    }
                }
                match best_move {
                    Some((axis, value, s)) => {
                        current[axis] = value;
                        current_score = s;
                    }
                    None => step /= 2.0,
                }
            }
        }

        debug!(candidates = scored.len(), "restart descent complete");
        into_ranked(scored)
    }
}

// ---------------------------------------------------------------------------
// Scored random batch
// ---------------------------------------------------------------------------

/// Samples a large random batch and ranks it by score.
pub struct BatchSamplingOptimizer;

impl AcquisitionOptimizer for BatchSamplingOptimizer {
    fn maximize(
        &mut self,
        score: &ScoreFn,
        space: &SearchSpace,
        _history: &History,
        num_points: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Configuration> {
        let scored: Vec<(Configuration, f64)> = (0..num_points)
            .map(|_| {
                let candidate = space.sample_one(rng);
                let s = score(&candidate);
                (candidate, s)
            })
            .collect();
        into_ranked(scored)
    }
}
