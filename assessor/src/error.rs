//! Error types for the assessor

use credit_primitives::{ErrorKind, MathError, Unauthorized};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for assessor operations
pub type Result<T> = std::result::Result<T, AssessorError>;

/// Assessor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssessorError {
    /// Upper bound zero, or not above the lower bound
    #[error("Invalid bounds: lower {lower}, upper {upper}")]
    InvalidBounds {
        /// Lower bound
        lower: Decimal,
        /// Upper bound
        upper: Decimal,
    },

    /// A score was required but the proof did not verify
    #[error("Invalid proof")]
    InvalidProof,

    /// Proven score above the configured maximum
    #[error("Score {score} exceeds max score {max_score}")]
    ScoreExceedsMax {
        /// Proven score
        score: u128,
        /// Configured maximum
        max_score: u128,
    },

    /// Mapper returned a value outside the bounds
    #[error("Mapped value {value} outside [{lower}, {upper}]")]
    OutOfBounds {
        /// Mapper output
        value: Decimal,
        /// Lower bound
        lower: Decimal,
        /// Upper bound
        upper: Decimal,
    },

    /// Max score must be non-zero
    #[error("Max score cannot be zero")]
    InvalidMaxScore,

    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] Unauthorized),

    /// Arithmetic failure
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl AssessorError {
    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssessorError::InvalidProof => ErrorKind::Proof,
            AssessorError::InvalidBounds { .. }
            | AssessorError::ScoreExceedsMax { .. }
            | AssessorError::OutOfBounds { .. }
            | AssessorError::InvalidMaxScore => ErrorKind::Bounds,
            AssessorError::Unauthorized(_) => ErrorKind::State,
            AssessorError::Math(_) => ErrorKind::Arithmetic,
        }
    }
}
