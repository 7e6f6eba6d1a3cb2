//! Error types for the score registry

use credit_primitives::{ErrorKind, Unauthorized};
use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] Unauthorized),

    /// Zero root submitted
    #[error("Merkle root cannot be empty")]
    EmptyRoot,

    /// Root rotation attempted before the delay boundary
    #[error("Root delay not elapsed: now {now}, ready at {ready_at}")]
    DelayNotElapsed {
        /// Call timestamp
        now: u64,
        /// Earliest allowed timestamp
        ready_at: u64,
    },

    /// Proof does not verify against the current root
    #[error("Invalid proof")]
    InvalidProof,

    /// Root delay must be non-zero
    #[error("Invalid root delay: {0}")]
    InvalidDelay(u64),
}

impl RegistryError {
    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Unauthorized(_) => ErrorKind::State,
            RegistryError::EmptyRoot | RegistryError::InvalidDelay(_) => ErrorKind::Bounds,
            RegistryError::DelayNotElapsed { .. } => ErrorKind::State,
            RegistryError::InvalidProof => ErrorKind::Proof,
        }
    }
}
