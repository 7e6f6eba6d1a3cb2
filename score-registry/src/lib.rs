//! Credit Vault score registry
//!
//! Stores a rotating pair of merkle roots and verifies account→score
//! inclusion proofs against the current one. Scores themselves never live
//! in the registry.
//!
//! # Invariants
//!
//! - A root reaches `current` only after waiting one full delay period
//! - Only the owner writes while paused, and never advances the timestamp
//! - Verification fails closed: a missing leaf and a bad path look the same

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod merkle;
pub mod registry;

// Re-exports
pub use error::{RegistryError, Result};
pub use merkle::{hash_pair, leaf_hash, verify_proof, MerkleTree};
pub use registry::{MerkleRootState, ScoreRecord, ScoreRegistry};
