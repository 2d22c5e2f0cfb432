//! Transfer-learning ensemble surrogate.
//!
//! Blends K frozen source regressors (fit once from prior runs) with an
//! online target regressor (refit every iteration on the current run's
//! data). Blend weights come from a pairwise rank-preservation ratio per
//! ensemble member, cubed and renormalized, so members whose predicted
//! ordering agrees with the observed ordering dominate the mix.

use sable_models::{build_regressor, Regressor, SurrogateKind};
use sable_types::{internal_error, SableResult, SourceTask};

use crate::observer::Observer;

const CV_FOLDS: usize = 5;
/// Below this many observations the target regressor is not fit at all.
const MIN_TARGET_SAMPLES: usize = 3;
/// Below this many observations the cross-validated target estimate is a
/// zero-confidence placeholder.
const MIN_CV_SAMPLES: usize = 5;

pub struct EnsembleSurrogate {
    base_kind: SurrogateKind,
    seed: u64,
    source_models: Vec<Box<dyn Regressor>>,
    target: Option<Box<dyn Regressor>>,
    /// Length K+1: K source weights plus the target weight last. Empty when
    /// no source tasks are configured (ensemble disabled).
    weights: Vec<f64>,
    weight_history: Vec<Vec<f64>>,
    iteration: usize,
}

impl EnsembleSurrogate {
    /// Fits the K source regressors from the given tasks. With no tasks the
    /// surrogate degenerates to a plain single-regressor wrapper.
    pub fn new(base_kind: SurrogateKind, source_tasks: &[SourceTask], seed: u64) -> Self {
        let mut ensemble = Self {
            base_kind: base_kind.base_kind(),
            seed,
            source_models: Vec::new(),
            target: None,
            weights: Vec::new(),
            weight_history: Vec::new(),
            iteration: 0,
        };
        ensemble.fit_source_models(source_tasks);
        ensemble
    }

    /// Replaces the stored source tasks and refits all source regressors
    /// from scratch.
    pub fn update_trials(&mut self, source_tasks: &[SourceTask]) {
        self.fit_source_models(source_tasks);
    }

    fn fit_source_models(&mut self, source_tasks: &[SourceTask]) {
        self.source_models = source_tasks
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let mut model = build_regressor(&self.base_kind, self.seed.wrapping_add(i as u64));
                model.fit(&task.design, &task.objectives);
                model
            })
            .collect();

        let k = self.source_models.len();
        self.weights = if k > 0 {
            let mut w = vec![1.0 / k as f64; k];
            w.push(0.0);
            w
        } else {
            Vec::new()
        };
    }

    pub fn num_sources(&self) -> usize {
        self.source_models.len()
    }

    fn has_sources(&self) -> bool {
        !self.source_models.is_empty()
    }

    /// Current blend weights (empty when the ensemble is disabled).
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Every weight vector produced so far, in training order.
    pub fn weight_history(&self) -> &[Vec<f64>] {
        &self.weight_history
    }

    fn fresh_member(&self, salt: u64) -> Box<dyn Regressor> {
        build_regressor(&self.base_kind, self.seed.wrapping_add(salt))
    }

    /// Fit the target regressor and recompute the blend weights.
    pub fn train(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        observer: &dyn Observer,
    ) -> SableResult<()> {
        let sample_num = y.len();

        self.target = if sample_num >= MIN_TARGET_SAMPLES {
            let mut model = self.fresh_member(1000 + self.iteration as u64);
            model.fit(x, y);
            Some(model)
        } else {
            None
        };

        if !self.has_sources() {
            return Ok(());
        }

        let mut mean_vectors: Vec<Vec<f64>> = self
            .source_models
            .iter()
            .map(|model| model.predict(x).0)
            .collect();

        let target_means = if sample_num >= MIN_CV_SAMPLES {
            self.cross_validated_means(x, y)?
        } else {
            vec![0.0; sample_num]
        };
        mean_vectors.push(target_means);

        self.weights = rank_weights(&mean_vectors, y);
        let weight_str = self
            .weights
            .iter()
            .map(|w| format!("{w:.2}"))
            .collect::<Vec<_>>()
            .join(",");
        observer.inform(&format!(
            "ensemble iter-{}: weights [{}]",
            self.iteration, weight_str
        ));
        self.weight_history.push(self.weights.clone());
        self.iteration += 1;
        Ok(())
    }

    /// Held-out predictions for every training row via 5-fold CV: each fold's
    /// rows are predicted by a fresh regressor fit on the remaining folds,
    /// and the held-out predictions are reassembled in original row order.
    fn cross_validated_means(&self, x: &[Vec<f64>], y: &[f64]) -> SableResult<Vec<f64>> {
        let n = y.len();
        let mut held_out_indices: Vec<usize> = Vec::with_capacity(n);
        let mut means: Vec<f64> = Vec::with_capacity(n);

        for fold in 0..CV_FOLDS {
            let start = fold * n / CV_FOLDS;
            let end = (fold + 1) * n / CV_FOLDS;

            let mut train_x: Vec<Vec<f64>> = Vec::with_capacity(n - (end - start));
            let mut train_y: Vec<f64> = Vec::with_capacity(n - (end - start));
            let mut val_x: Vec<Vec<f64>> = Vec::with_capacity(end - start);
            for i in 0..n {
                if i >= start && i < end {
                    held_out_indices.push(i);
                    val_x.push(x[i].clone());
                } else {
                    train_x.push(x[i].clone());
                    train_y.push(y[i]);
                }
            }

            let mut model = self.fresh_member(2000 + fold as u64);
            model.fit(&train_x, &train_y);
            let (mu, _) = model.predict(&val_x);
            means.extend(mu);
        }

        // The held-out folds must reassemble the full index range exactly
        // once each; anything else is a fold-partitioning bug.
        if held_out_indices != (0..n).collect::<Vec<_>>() {
            return Err(internal_error!(
                "cross-validation fold union does not reconstruct 0..{n}"
            ));
        }
        Ok(means)
    }

    /// Blended prediction: mean = sum(w_i * mean_i), variance =
    /// sum(w_i^2 * var_i). The squared weights assume the members' errors
    /// are uncorrelated; this mirrors the source method and is kept as-is.
    pub fn predict(&self, x: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
        let n = x.len();
        let (target_mu, target_var) = match &self.target {
            Some(model) => model.predict(x),
            None => (vec![0.0; n], vec![0.0; n]),
        };

        if !self.has_sources() {
            return (target_mu, target_var);
        }

        let w_target = *self.weights.last().unwrap_or(&0.0);
        let mut mu: Vec<f64> = target_mu.iter().map(|m| m * w_target).collect();
        let mut var: Vec<f64> = target_var
            .iter()
            .map(|v| v * w_target * w_target)
            .collect();

        for (model, &w) in self.source_models.iter().zip(&self.weights) {
            let (src_mu, src_var) = model.predict(x);
            for i in 0..n {
                mu[i] += w * src_mu[i];
                var[i] += w * w * src_var[i];
            }
        }
        (mu, var)
    }
}

/// Count of sample pairs whose predicted ordering agrees with the true
/// ordering (ties included via the XOR of strict comparisons), and the total
/// pair count.
fn preserving_order_counts(pred: &[f64], truth: &[f64]) -> (usize, usize) {
    debug_assert_eq!(pred.len(), truth.len());
    let n = pred.len();
    let mut preserved = 0;
    let mut total = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            if (truth[i] > truth[j]) == (pred[i] > pred[j]) {
                preserved += 1;
            }
            total += 1;
        }
    }
    (preserved, total)
}

/// Fraction of order-preserving pairs, in [0, 1]. Zero when there are no
/// pairs to compare.
pub fn rank_preservation_ratio(pred: &[f64], truth: &[f64]) -> f64 {
    let (preserved, total) = preserving_order_counts(pred, truth);
    if total == 0 {
        return 0.0;
    }
    preserved as f64 / total as f64
}

/// Rank-preservation ratios per mean vector, cubed and renormalized to a
/// weight vector summing to one. Cubing sharpens the mix: strong agreement
/// is rewarded and mediocre members suppressed.
fn rank_weights(mean_vectors: &[Vec<f64>], truth: &[f64]) -> Vec<f64> {
    const SHARPEN_POWER: i32 = 3;

    let powered: Vec<f64> = mean_vectors
        .iter()
        .map(|pred| rank_preservation_ratio(pred, truth).powi(SHARPEN_POWER))
        .collect();
    let total: f64 = powered.iter().sum();
    if total <= 0.0 {
        // No member preserves any ordering; fall back to a uniform mix.
        return vec![1.0 / powered.len() as f64; powered.len()];
    }
    powered.into_iter().map(|p| p / total).collect()
}
