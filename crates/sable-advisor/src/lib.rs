//! # sable-advisor
//!
//! The Sable optimization advisor: given the history of evaluated
//! configurations it proposes the next one(s) to try, optionally transferring
//! knowledge from prior runs through a rank-weighted ensemble surrogate.
//!
//! The caller owns the [`sable_types::History`]; the loop is append an
//! observation, ask [`OptimizationAdvisor::get_suggestion`], evaluate
//! externally, repeat.

pub mod advisor;
pub mod design;
pub mod ensemble;
pub mod observer;
pub mod samplers;

pub use advisor::{
    auto_select, AdvisorConfig, OptimizationAdvisor, SearchMode, StrategyKnobs,
};
pub use design::{create_initial_design, farthest_point_selection, InitStrategy};
pub use ensemble::EnsembleSurrogate;
pub use observer::{CapturingObserver, Observer, TracingObserver};
