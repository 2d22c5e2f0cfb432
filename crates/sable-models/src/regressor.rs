//! The regressor capability: models that fit a design matrix and predict
//! (mean, variance) pairs at unseen points.
//!
//! Two built-in families back the advisor's "smooth" and "robust" strategy
//! kinds: a kernel regressor for low-dimensional, mostly-continuous spaces,
//! and a bagged nearest-neighbour ensemble that tolerates mixed types and
//! noise. Both are deliberately lightweight; heavier models plug in behind
//! the same trait.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::stats;

/// Predicts objective mean and variance at encoded configurations.
///
/// An unfitted regressor predicts zero mean and zero variance rather than
/// failing; callers gate on data counts before trusting predictions.
pub trait Regressor: Send {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]);
    fn predict(&self, x: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>);
}

/// Kernel choice for the smooth regressor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kernel {
    /// Matern 5/2: the default smooth kernel.
    Matern,
    /// Squared-exponential; forced by the entropy-search acquisition family.
    Rbf,
}

/// Base model family underneath a transfer-learning ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferBase {
    Smooth,
    Robust,
}

/// Closed set of surrogate strategy kinds.
///
/// The tag carries its derived parameters (kernel choice, transfer base) as
/// named fields; there is no string form other than [`std::fmt::Display`]
/// for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurrogateKind {
    /// Kernel regression; suits low-dimensional, mathematically smooth
    /// objectives.
    Smooth { kernel: Kernel },
    /// Bagged nearest-neighbour ensemble; suits high-dimensional, mixed-type
    /// or noisy spaces.
    Robust,
    /// Rank-weighted ensemble over frozen source models plus an online
    /// target model of the given base family.
    Transfer { base: TransferBase },
}

impl SurrogateKind {
    pub fn smooth() -> Self {
        Self::Smooth {
            kernel: Kernel::Matern,
        }
    }

    pub fn smooth_rbf() -> Self {
        Self::Smooth { kernel: Kernel::Rbf }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    pub fn is_smooth(&self) -> bool {
        matches!(self, Self::Smooth { .. })
    }

    /// The plain (non-ensemble) kind used to build individual members.
    pub fn base_kind(&self) -> SurrogateKind {
        match self {
            Self::Transfer {
                base: TransferBase::Smooth,
            } => Self::smooth(),
            Self::Transfer {
                base: TransferBase::Robust,
            } => Self::Robust,
            other => *other,
        }
    }
}

impl std::fmt::Display for SurrogateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Smooth {
                kernel: Kernel::Matern,
            } => "smooth",
            Self::Smooth { kernel: Kernel::Rbf } => "smooth-rbf",
            Self::Robust => "robust",
            Self::Transfer {
                base: TransferBase::Smooth,
            } => "transfer-smooth",
            Self::Transfer {
                base: TransferBase::Robust,
            } => "transfer-robust",
        };
        write!(f, "{name}")
    }
}

/// Factory lookup: one plain regressor per kind. Transfer kinds resolve to
/// their base family; the ensemble wrapper around them lives in the advisor.
pub fn build_regressor(kind: &SurrogateKind, seed: u64) -> Box<dyn Regressor> {
    match kind.base_kind() {
        SurrogateKind::Smooth { kernel } => Box::new(KernelRegressor::new(kernel)),
        SurrogateKind::Robust => Box::new(NeighborBaggingRegressor::new(seed)),
        SurrogateKind::Transfer { .. } => unreachable!("base_kind never returns Transfer"),
    }
}

// ---------------------------------------------------------------------------
// Smooth family: kernel regression
// ---------------------------------------------------------------------------

/// Nadaraya–Watson kernel regressor over unit-cube inputs.
///
/// The mean is a kernel-weighted average of observed targets; the variance
/// shrinks with local observation density, starting from the sample variance
/// of the targets.
pub struct KernelRegressor {
    kernel: Kernel,
    bandwidth: f64,
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    prior_variance: f64,
    y_mean: f64,
}

impl KernelRegressor {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            bandwidth: 0.25,
            x: Vec::new(),
            y: Vec::new(),
            prior_variance: 1.0,
            y_mean: 0.0,
        }
    }

    pub fn with_bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth.max(1e-6);
        self
    }

    fn kernel_value(&self, squared_distance: f64) -> f64 {
        let h = self.bandwidth;
        match self.kernel {
            Kernel::Rbf => (-squared_distance / (2.0 * h * h)).exp(),
            Kernel::Matern => {
                let a = (5.0f64).sqrt() * squared_distance.sqrt() / h;
                (1.0 + a + a * a / 3.0) * (-a).exp()
            }
        }
    }
}

impl Regressor for KernelRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) {
        self.x = x.to_vec();
        self.y = y.to_vec();
        self.y_mean = stats::mean(y);
        self.prior_variance = stats::variance(y).max(1e-12);
    }

    fn predict(&self, x: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
        let n = x.len();
        if self.y.is_empty() {
            return (vec![0.0; n], vec![0.0; n]);
        }

        let mut means = Vec::with_capacity(n);
        let mut variances = Vec::with_capacity(n);
        for point in x {
            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for (row, &target) in self.x.iter().zip(&self.y) {
                let w = self.kernel_value(stats::squared_distance(point, row));
                weighted_sum += w * target;
                weight_total += w;
            }
            let mean = if weight_total > 1e-10 {
                weighted_sum / weight_total
            } else {
                self.y_mean
            };
            // Uncertainty shrinks with observation density around the point.
            let variance = self.prior_variance / (1.0 + weight_total);
            means.push(mean);
            variances.push(variance);
        }
        (means, variances)
    }
}

// ---------------------------------------------------------------------------
// Robust family: bagged nearest neighbours
// ---------------------------------------------------------------------------

/// Bootstrap ensemble of nearest-neighbour predictors.
///
/// Each bag resamples the training rows with replacement; a prediction is the
/// target of the nearest row within the bag. Mean and variance are taken
/// across bags, so disagreement between bags is the uncertainty signal.
pub struct NeighborBaggingRegressor {
    num_bags: usize,
    seed: u64,
    bags: Vec<Vec<usize>>,
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
}

impl NeighborBaggingRegressor {
    pub fn new(seed: u64) -> Self {
        Self {
            num_bags: 25,
            seed,
            bags: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    pub fn with_num_bags(mut self, num_bags: usize) -> Self {
        self.num_bags = num_bags.max(1);
        self
    }

    fn nearest_in_bag(&self, bag: &[usize], point: &[f64]) -> f64 {
        let mut best = f64::INFINITY;
        let mut value = 0.0;
        for &idx in bag {
            let d = stats::squared_distance(point, &self.x[idx]);
            if d < best {
                best = d;
                value = self.y[idx];
            }
        }
        value
    }
}

impl Regressor for NeighborBaggingRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) {
        self.x = x.to_vec();
        self.y = y.to_vec();
        self.bags.clear();

        let n = y.len();
        if n == 0 {
            return;
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        for _ in 0..self.num_bags {
            let bag: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            self.bags.push(bag);
        }
    }

    fn predict(&self, x: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
        let n = x.len();
        if self.y.is_empty() {
            return (vec![0.0; n], vec![0.0; n]);
        }

        let mut means = Vec::with_capacity(n);
        let mut variances = Vec::with_capacity(n);
        for point in x {
            let votes: Vec<f64> = self
                .bags
                .iter()
                .map(|bag| self.nearest_in_bag(bag, point))
                .collect();
            means.push(stats::mean(&votes));
            variances.push(stats::variance(&votes));
        }
        (means, variances)
    }
}

// ---------------------------------------------------------------------------
// Scalarizing wrapper for multi-objective scalarization methods
// ---------------------------------------------------------------------------

/// Wraps a single regressor behind a random-weight augmented-Tchebycheff
/// scalarization of the objective rows.
pub struct ScalarizedRegressor {
    inner: Box<dyn Regressor>,
    weights: Vec<f64>,
    rho: f64,
}

impl ScalarizedRegressor {
    pub fn new(inner: Box<dyn Regressor>, num_objectives: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let raw: Vec<f64> = (0..num_objectives).map(|_| rng.random::<f64>()).collect();
        let total: f64 = raw.iter().sum::<f64>().max(1e-12);
        Self {
            inner,
            weights: raw.into_iter().map(|w| w / total).collect(),
            rho: 0.05,
        }
    }

    /// Augmented Tchebycheff value of one objective row.
    pub fn scalarize(&self, objectives: &[f64]) -> f64 {
        let weighted: Vec<f64> = objectives
            .iter()
            .zip(&self.weights)
            .map(|(y, w)| y * w)
            .collect();
        let max = weighted.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        max + self.rho * weighted.iter().sum::<f64>()
    }

    /// Fit on scalarized objective rows.
    pub fn fit_multi(&mut self, x: &[Vec<f64>], y_rows: &[Vec<f64>]) {
        let scalarized: Vec<f64> = y_rows.iter().map(|row| self.scalarize(row)).collect();
        self.inner.fit(x, &scalarized);
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
        self.inner.predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_1d(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|&v| vec![v]).collect()
    }

    #[test]
    fn kind_display_names() {
        assert_eq!(SurrogateKind::smooth().to_string(), "smooth");
        assert_eq!(SurrogateKind::smooth_rbf().to_string(), "smooth-rbf");
        assert_eq!(SurrogateKind::Robust.to_string(), "robust");
        assert_eq!(
            SurrogateKind::Transfer {
                base: TransferBase::Smooth
            }
            .to_string(),
            "transfer-smooth"
        );
    }

    #[test]
    fn transfer_kind_resolves_base() {
        let kind = SurrogateKind::Transfer {
            base: TransferBase::Robust,
        };
        assert!(kind.is_transfer());
        assert_eq!(kind.base_kind(), SurrogateKind::Robust);
        assert_eq!(SurrogateKind::smooth().base_kind(), SurrogateKind::smooth());
    }

    #[test]
    fn kernel_regressor_interpolates_smoothly() {
        let mut model = KernelRegressor::new(Kernel::Rbf).with_bandwidth(0.1);
        let x = grid_1d(&[0.0, 0.5, 1.0]);
        model.fit(&x, &[0.0, 1.0, 0.0]);

        let (mean, var) = model.predict(&grid_1d(&[0.5, 0.05]));
        assert!((mean[0] - 1.0).abs() < 0.1, "mean at data point: {}", mean[0]);
        assert!(mean[1] < mean[0]);
        // Variance is larger away from the data than on top of it.
        let (_, var_far) = model.predict(&grid_1d(&[0.25]));
        assert!(var_far[0] > var[0]);
    }

    #[test]
    fn unfitted_regressors_predict_zero() {
        let kernel = KernelRegressor::new(Kernel::Matern);
        let bagging = NeighborBaggingRegressor::new(42);
        let x = grid_1d(&[0.3, 0.7]);

        assert_eq!(kernel.predict(&x), (vec![0.0, 0.0], vec![0.0, 0.0]));
        assert_eq!(bagging.predict(&x), (vec![0.0, 0.0], vec![0.0, 0.0]));
    }

    #[test]
    fn bagging_regressor_tracks_local_structure() {
        let mut model = NeighborBaggingRegressor::new(7);
        let x = grid_1d(&[0.0, 0.1, 0.9, 1.0]);
        model.fit(&x, &[5.0, 5.0, -5.0, -5.0]);

        let (mean, _) = model.predict(&grid_1d(&[0.05, 0.95]));
        assert!(mean[0] > 0.0);
        assert!(mean[1] < 0.0);
    }

    #[test]
    fn bagging_variance_reflects_disagreement() {
        let mut model = NeighborBaggingRegressor::new(7);
        // Two coincident points with very different targets: bags disagree.
        let x = grid_1d(&[0.5, 0.5, 0.5]);
        model.fit(&x, &[0.0, 10.0, 0.0]);

        let (_, var) = model.predict(&grid_1d(&[0.5]));
        assert!(var[0] > 0.0);
    }

    #[test]
    fn scalarization_weights_sum_to_one() {
        let inner = Box::new(KernelRegressor::new(Kernel::Matern));
        let model = ScalarizedRegressor::new(inner, 3, 11);
        let total: f64 = model.weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(model.weights.iter().all(|&w| w >= 0.0));

        let a = model.scalarize(&[1.0, 1.0, 1.0]);
        let b = model.scalarize(&[2.0, 2.0, 2.0]);
        assert!(b > a);
    }

    #[test]
    fn factory_builds_each_kind() {
        for kind in [
            SurrogateKind::smooth(),
            SurrogateKind::smooth_rbf(),
            SurrogateKind::Robust,
            SurrogateKind::Transfer {
                base: TransferBase::Smooth,
            },
        ] {
            let mut model = build_regressor(&kind, 1);
            model.fit(&grid_1d(&[0.0, 1.0]), &[0.0, 1.0]);
            let (mean, var) = model.predict(&grid_1d(&[0.5]));
            assert_eq!(mean.len(), 1);
            assert_eq!(var.len(), 1);
        }
    }
}
