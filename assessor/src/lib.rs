//! Credit Vault assessor
//!
//! Converts a verified credit score into a collateralization bound through a
//! pluggable `Mapper`. Without a verifiable score the most conservative bound
//! (the upper one) applies.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod assessor;
pub mod error;
pub mod mapper;

// Re-exports
pub use assessor::Assessor;
pub use error::{AssessorError, Result};
pub use mapper::{LinearMapper, Mapper};
