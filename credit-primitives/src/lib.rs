//! Credit Vault primitives
//!
//! Shared building blocks for the score registry, assessor, liquidity pool
//! and vault ledger crates.
//!
//! # Contents
//!
//! - **Wire types**: `Address`, `ProtocolTag`, `ScoreProof`, `CallContext`
//! - **Fixed point**: `Decimal` ratios with explicit rounding direction
//! - **Authorization**: enum-keyed role table checked at every restricted call
//! - **Token bank**: the token collaborator interface plus an in-memory bank

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod auth;
pub mod bank;
pub mod error;
pub mod math;
pub mod types;

// Re-exports
pub use auth::{Authorization, Role, Unauthorized};
pub use bank::{BankError, InMemoryBank, TokenBank, Transfer};
pub use error::ErrorKind;
pub use math::{MathError, Rounding, WAD, WAD_DECIMALS};
pub use types::{Address, CallContext, ParseError, ProtocolTag, ScoreProof};
