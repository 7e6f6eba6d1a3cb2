//! Credit Vault Core
//!
//! Collateralized debt ledgers whose required collateral ratio depends on a
//! Merkle-proven credit score, backed by a shared stablecoin pool.
//!
//! # Architecture
//!
//! - **Ledger**: per-collateral vaults with a borrow index for interest
//! - **Market**: ledgers plus the registry, assessor, pool and token bank
//! - **Single Writer**: one actor task owns the market
//! - **Journal**: successful operations are batched into RocksDB
//!
//! # Invariants
//!
//! - A vault with debt holds collateral worth at least debt times its
//!   assessed c-ratio after every borrow and withdrawal
//! - Operations are atomic: a rejected call changes no ledger, pool or
//!   token balance
//! - The borrow index never decreases

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod interest;
pub mod ledger;
pub mod market;
pub mod metrics;
pub mod oracle;
pub mod storage;
pub mod types;

// Re-exports
pub use actor::{spawn_market_actor, MarketHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventRecord, LedgerEvent};
pub use http::{router, HttpState};
pub use interest::BorrowIndex;
pub use ledger::{Collaborators, VaultLedger};
pub use market::Market;
pub use metrics::Metrics;
pub use oracle::{Oracle, PriceReading, SharedPriceOracle};
pub use storage::{EventJournal, Journal};
pub use types::{LedgerParams, Vault, VaultView};
