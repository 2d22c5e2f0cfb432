//! The acquisition capability: scores candidate points from model
//! predictions, balancing predicted quality against uncertainty.
//!
//! All objectives are minimized. Each kind validates the context fields it
//! needs in `update` and is then evaluated point-by-point by an acquisition
//! optimizer through `score`.

use serde::{Deserialize, Serialize};

use sable_types::{SableResult, SetupError};

use crate::stats::{normal_cdf, normal_pdf};

/// One model prediction at a candidate point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEstimate {
    pub mean: f64,
    pub variance: f64,
}

impl PointEstimate {
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    fn sigma(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// Axis-aligned hypercell decomposition of non-dominated objective space,
/// row-per-cell, column-per-objective.
#[derive(Debug, Clone, PartialEq)]
pub struct CellBounds {
    pub lower: Vec<Vec<f64>>,
    pub upper: Vec<Vec<f64>>,
}

/// State handed to an acquisition function once per suggestion call.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionContext {
    pub num_data: usize,
    /// Single-objective (possibly scalarized) incumbent value.
    pub incumbent: Option<f64>,
    /// Per-objective incumbent values for multi-objective problems.
    pub mo_incumbents: Vec<f64>,
    /// Hypercell decomposition for the hypervolume family.
    pub cell_bounds: Option<CellBounds>,
    /// Raw constraint performance rows for the entropy-search family.
    pub constraint_perfs: Vec<Vec<f64>>,
}

/// Maintains internal state from models/incumbents/constraints; maximized by
/// the acquisition optimizer.
pub trait Acquisition: Send {
    fn update(&mut self, ctx: AcquisitionContext) -> SableResult<()>;
    fn score(&self, objectives: &[PointEstimate], constraints: &[PointEstimate]) -> f64;
}

/// Closed set of acquisition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionKind {
    /// Expected improvement (single objective).
    Ei,
    /// Expected constrained improvement.
    Eic,
    /// Expected hypervolume improvement (multi-objective, <= 4 objectives).
    Ehvi,
    /// Expected hypervolume improvement with constraints.
    Ehvic,
    /// Max-value entropy search (multi-objective, > 4 objectives).
    Mesmo,
    /// Max-value entropy search with constraints.
    Mesmoc,
    /// Expected improvement over a scalarized multi-objective model.
    Scalarized,
}

impl AcquisitionKind {
    pub fn is_hypervolume(&self) -> bool {
        matches!(self, Self::Ehvi | Self::Ehvic)
    }

    pub fn is_entropy_search(&self) -> bool {
        matches!(self, Self::Mesmo | Self::Mesmoc)
    }

    pub fn is_scalarized(&self) -> bool {
        matches!(self, Self::Scalarized)
    }

    /// The legal set for a given objective/constraint combination.
    pub fn is_legal_for(&self, num_objectives: usize, num_constraints: usize) -> bool {
        match (num_objectives, num_constraints) {
            (1, 0) => matches!(self, Self::Ei),
            (1, _) => matches!(self, Self::Eic),
            (_, 0) => matches!(self, Self::Ehvi | Self::Mesmo | Self::Scalarized),
            (_, _) => matches!(self, Self::Ehvic | Self::Mesmoc),
        }
    }
}

impl std::fmt::Display for AcquisitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ei => "ei",
            Self::Eic => "eic",
            Self::Ehvi => "ehvi",
            Self::Ehvic => "ehvic",
            Self::Mesmo => "mesmo",
            Self::Mesmoc => "mesmoc",
            Self::Scalarized => "scalarized",
        };
        write!(f, "{name}")
    }
}

/// Factory lookup: one acquisition function per kind.
pub fn build_acquisition(kind: AcquisitionKind) -> Box<dyn Acquisition> {
    match kind {
        AcquisitionKind::Ei | AcquisitionKind::Scalarized => {
            Box::new(ExpectedImprovement::new(false))
        }
        AcquisitionKind::Eic => Box::new(ExpectedImprovement::new(true)),
        AcquisitionKind::Ehvi => Box::new(HypervolumeImprovement::new(false)),
        AcquisitionKind::Ehvic => Box::new(HypervolumeImprovement::new(true)),
        AcquisitionKind::Mesmo => Box::new(MaxValueEntropySearch::new(false)),
        AcquisitionKind::Mesmoc => Box::new(MaxValueEntropySearch::new(true)),
    }
}

/// Probability that all constraints are satisfied (<= 0), assuming
/// independent Gaussian constraint predictions.
fn feasibility_probability(constraints: &[PointEstimate]) -> f64 {
    constraints
        .iter()
        .map(|c| {
            let sigma = c.sigma();
            if sigma < 1e-12 {
                if c.mean <= 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                normal_cdf(-c.mean / sigma)
            }
        })
        .product()
}

// ---------------------------------------------------------------------------
// Expected improvement (plain / constrained / scalarized)
// ---------------------------------------------------------------------------

pub struct ExpectedImprovement {
    constrained: bool,
    eta: Option<f64>,
}

impl ExpectedImprovement {
    pub fn new(constrained: bool) -> Self {
        Self {
            constrained,
            eta: None,
        }
    }
}

impl Acquisition for ExpectedImprovement {
    fn update(&mut self, ctx: AcquisitionContext) -> SableResult<()> {
        self.eta = Some(ctx.incumbent.ok_or(SetupError::InvalidCounts {
            message: "expected-improvement update requires an incumbent value".to_string(),
        })?);
        Ok(())
    }

    fn score(&self, objectives: &[PointEstimate], constraints: &[PointEstimate]) -> f64 {
        let Some(eta) = self.eta else { return 0.0 };
        let estimate = &objectives[0];
        let improvement = eta - estimate.mean;
        let sigma = estimate.sigma();

        let ei = if sigma < 1e-12 {
            improvement.max(0.0)
        } else {
            let z = improvement / sigma;
            improvement * normal_cdf(z) + sigma * normal_pdf(z)
        };

        if self.constrained {
            ei * feasibility_probability(constraints)
        } else {
            ei
        }
    }
}

// ---------------------------------------------------------------------------
// Expected hypervolume improvement
// ---------------------------------------------------------------------------

pub struct HypervolumeImprovement {
    constrained: bool,
    cells: Option<CellBounds>,
}

impl HypervolumeImprovement {
    pub fn new(constrained: bool) -> Self {
        Self {
            constrained,
            cells: None,
        }
    }

    /// E[(bound - Y)^+] for Gaussian Y; zero for an unbounded-below edge.
    fn expected_shortfall(bound: f64, estimate: &PointEstimate) -> f64 {
        if !bound.is_finite() {
            return if bound > 0.0 { f64::INFINITY } else { 0.0 };
        }
        let sigma = estimate.sigma();
        let gap = bound - estimate.mean;
        if sigma < 1e-12 {
            return gap.max(0.0);
        }
        let z = gap / sigma;
        gap * normal_cdf(z) + sigma * normal_pdf(z)
    }
}

impl Acquisition for HypervolumeImprovement {
    fn update(&mut self, ctx: AcquisitionContext) -> SableResult<()> {
        self.cells = Some(ctx.cell_bounds.ok_or(SetupError::InvalidCounts {
            message: "hypervolume update requires cell bounds".to_string(),
        })?);
        Ok(())
    }

    fn score(&self, objectives: &[PointEstimate], constraints: &[PointEstimate]) -> f64 {
        let Some(cells) = &self.cells else { return 0.0 };

        // Per cell: product over objectives of the expected overlap between
        // the cell's [lower, upper] slab and the predictive distribution.
        let mut total = 0.0;
        for (lower, upper) in cells.lower.iter().zip(&cells.upper) {
            let mut cell_value = 1.0;
            for (m, estimate) in objectives.iter().enumerate() {
                let above = Self::expected_shortfall(upper[m], estimate);
                let below = Self::expected_shortfall(lower[m], estimate);
                cell_value *= (above - below).max(0.0);
                if cell_value == 0.0 {
                    break;
                }
            }
            total += cell_value;
        }

        if self.constrained {
            total * feasibility_probability(constraints)
        } else {
            total
        }
    }
}

// ---------------------------------------------------------------------------
// Max-value entropy search
// ---------------------------------------------------------------------------

pub struct MaxValueEntropySearch {
    constrained: bool,
    best_values: Vec<f64>,
}

impl MaxValueEntropySearch {
    pub fn new(constrained: bool) -> Self {
        Self {
            constrained,
            best_values: Vec::new(),
        }
    }
}

impl Acquisition for MaxValueEntropySearch {
    fn update(&mut self, ctx: AcquisitionContext) -> SableResult<()> {
        if ctx.mo_incumbents.is_empty() {
            return Err(SetupError::InvalidCounts {
                message: "entropy-search update requires incumbent values".to_string(),
            }
            .into());
        }
        if self.constrained && ctx.constraint_perfs.is_empty() {
            return Err(SetupError::InvalidCounts {
                message: "constrained entropy-search update requires constraint performances"
                    .to_string(),
            }
            .into());
        }
        self.best_values = ctx.mo_incumbents;
        Ok(())
    }

    fn score(&self, objectives: &[PointEstimate], constraints: &[PointEstimate]) -> f64 {
        if self.best_values.is_empty() {
            return 0.0;
        }

        // Single-sample MES bound per objective, using the incumbent values
        // as stand-ins for sampled minima (objectives are negated into a
        // maximization view so the classic gamma formula applies).
        let mut total = 0.0;
        for (estimate, &best) in objectives.iter().zip(&self.best_values) {
            let sigma = estimate.sigma().max(1e-12);
            let gamma = ((-best) - (-estimate.mean)) / sigma;
            let cdf = normal_cdf(gamma).max(1e-12);
            total += gamma * normal_pdf(gamma) / (2.0 * cdf) - cdf.ln();
        }

        if self.constrained {
            total * feasibility_probability(constraints)
        } else {
            total
        }
    }
}
