//! Credit Vault liquidity pool
//!
//! Shared multi-stablecoin reserve. Ledgers draw stables from it when users
//! borrow and return them on repayment; LPs earn the pool's share of
//! interest through a rising share price.
//!
//! # Invariants
//!
//! - Per-asset `amount_used <= limit`
//! - Per-core swap `amount_used <= limit`
//! - A zero deposit limit means the asset is not supported

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod pool;
pub mod types;

// Re-exports
pub use error::{PoolError, Result};
pub use pool::LiquidityPool;
pub use types::{AssetState, InterestPlan, SwapDirection, SwapPlan, Utilization, WithdrawTarget};
