use crate::solvers::Method;
use serde::Serialize;
use thiserror::Error;

/// Errors reported by the curve engine.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    #[error("Step size {value} is outside [{min}, {max}].")]
    StepSizeOutOfRange { value: f64, min: f64, max: f64 },

    #[error("Step size {value} is not a multiple of {increment}.")]
    StepSizeOffGrid { value: f64, increment: f64 },

    /// The curve was truncated at `(x, y)`, the last finite point.
    #[error("{method} curve diverged after x = {x} (last finite y = {y}, next y = {next_y}).")]
    NumericalDivergence {
        method: Method,
        x: f64,
        y: f64,
        next_y: f64,
    },

    #[error("{method} curve stopped after {steps} steps without leaving the viewport.")]
    IterationLimit { method: Method, steps: usize },

    #[error("Invalid generator settings: {message}")]
    InvalidSettings { message: String },
}

impl EngineError {
    /// True for both ways a step size can be rejected.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            EngineError::StepSizeOutOfRange { .. } | EngineError::StepSizeOffGrid { .. }
        )
    }

    /// True when a curve had to be cut short.
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            EngineError::NumericalDivergence { .. } | EngineError::IterationLimit { .. }
        )
    }
}
