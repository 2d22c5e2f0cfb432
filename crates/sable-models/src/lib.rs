//! # sable-models
//!
//! The three capability seams the Sable advisor composes — regressors,
//! acquisition functions and acquisition optimizers — each as a trait with a
//! closed kind enum and a single factory lookup table, plus the
//! non-dominated partitioning helper for the hypervolume family.

pub mod acquisition;
pub mod optimizer;
pub mod pareto;
pub mod regressor;
pub mod stats;

pub use acquisition::{
    build_acquisition, Acquisition, AcquisitionContext, AcquisitionKind, CellBounds,
    PointEstimate,
};
pub use optimizer::{build_acq_optimizer, AcquisitionOptimizer, OptimizerKind, ScoreFn};
pub use pareto::{hypercell_bounds, pareto_front};
pub use regressor::{
    build_regressor, Kernel, KernelRegressor, NeighborBaggingRegressor, Regressor,
    ScalarizedRegressor, SurrogateKind, TransferBase,
};
