//! # sable-types
//!
//! Shared value types for the Sable optimization advisor: search-space and
//! configuration definitions, the observation history of a run, source tasks
//! for transfer learning, and the workspace-wide error types.

pub mod errors;
pub mod history;
pub mod space;

pub use errors::*;
pub use history::*;
pub use space::*;
