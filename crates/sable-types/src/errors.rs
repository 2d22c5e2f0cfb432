use thiserror::Error;

/// Main error type for the Sable system
#[derive(Error, Debug)]
pub enum SableError {
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while validating or constructing an advisor.
///
/// All of these are fatal: the advisor refuses to come up with an
/// inconsistent strategy rather than degrade silently.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Unsupported {field}: {value}")]
    UnsupportedOption { field: String, value: String },

    #[error("Acquisition kind {acquisition} is not legal for {num_objectives} objective(s) and {num_constraints} constraint(s)")]
    IllegalAcquisition {
        acquisition: String,
        num_objectives: usize,
        num_constraints: usize,
    },

    #[error("A reference point must be provided for hypervolume-based acquisition")]
    MissingReferencePoint,

    #[error("Reference point has {got} entries, expected {expected}")]
    ReferencePointDimension { got: usize, expected: usize },

    #[error("Transfer learning is only supported for single-objective unconstrained problems (got {num_objectives} objectives, {num_constraints} constraints)")]
    TransferUnsupported {
        num_objectives: usize,
        num_constraints: usize,
    },

    #[error("Transfer history supplied but surrogate kind {surrogate} carries no transfer method")]
    TransferKindMismatch { surrogate: String },

    #[error("Invalid objective/constraint counts: {message}")]
    InvalidCounts { message: String },
}

/// Search-space and configuration errors.
#[derive(Error, Debug)]
pub enum SpaceError {
    #[error("Parameter {name}: invalid range [{low}, {high}]")]
    InvalidRange { name: String, low: f64, high: f64 },

    #[error("Parameter {name}: empty choice list")]
    EmptyChoices { name: String },

    #[error("Configuration has {got} values, space has {expected} parameters")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("Configuration value for {name} is out of range or of the wrong kind")]
    InvalidValue { name: String },
}

/// Result type alias for Sable operations
pub type SableResult<T> = Result<T, SableError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::SableError::Internal(format!($($arg)*))
    };
}
