//! Error types for the animation graph.

use thiserror::Error;

/// Result type for graph configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors detected synchronously while building nodes or drivers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Both spring parameter sets were supplied.
    #[error("spring accepts bounciness/speed or tension/friction, not both")]
    ConflictingSpringParameters,

    /// Interpolation input range is too short or not sorted.
    #[error("interpolation input range must hold at least 2 non-decreasing values, got {0:?}")]
    BadInputRange(Vec<f64>),

    /// Interpolation output range length disagrees with the input range.
    #[error("interpolation output range has {output} entries for {input} inputs")]
    RangeLengthMismatch { input: usize, output: usize },

    /// String output patterns do not share one shape.
    #[error("interpolation output patterns disagree in shape: {0:?} vs {1:?}")]
    PatternMismatch(String, String),

    /// A string output pattern carries no numeric component to interpolate.
    #[error("interpolation output pattern {0:?} has no numeric component")]
    PatternWithoutNumber(String),

    /// The upstream node does not produce a scalar.
    #[error("interpolation parent produces {0}, expected a numeric value")]
    NonNumericParent(&'static str),
}

/// Errors raised while applying an event mapping to a payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    /// A mapped value leaf met a non-numeric payload field.
    #[error("event field {path:?} is not numeric")]
    NonNumericField { path: String },

    /// The mapping tree and the payload tree disagree in shape.
    #[error("event payload at {path:?} does not match the mapping shape")]
    ShapeMismatch { path: String },

    /// The payload has fewer arguments than the mapping.
    #[error("event mapping expects {expected} arguments, payload has {got}")]
    MissingArgument { expected: usize, got: usize },
}
