//! Error taxonomy for the spawn-rate controller.
//!
//! Only shape and index errors are real failures: they mean an internal
//! invariant broke and the current fit cycle is abandoned. The rest are
//! expected conditions that callers handle locally.

use thiserror::Error;

use crate::systems::sample::Feature;

/// Result type alias using [`ControllerError`].
pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("shape mismatch in {op}: left is {}x{}, right is {}x{}", left.0, left.1, right.0, right.1)]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("index ({row}, {col}) out of range for a {rows}x{cols} matrix")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("feature {feature:?} has zero spread (every row is {value})")]
    DegenerateFeature { feature: Feature, value: f64 },

    #[error("inversion did not reach the target within {iterations} iterations (last prediction {last_prediction})")]
    InversionUnresolved {
        iterations: usize,
        last_prediction: f64,
    },

    #[error("not enough samples: have {have}, need {need}")]
    InsufficientData { have: usize, need: usize },
}

impl ControllerError {
    /// Shape and index errors indicate a broken invariant, not bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            ControllerError::ShapeMismatch { .. } | ControllerError::IndexOutOfRange { .. }
        )
    }
}
