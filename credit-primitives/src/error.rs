//! Error classification shared by every crate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse error category
///
/// Each crate's error enum maps its variants onto one of these so callers
/// (metrics, the actor, tests) can branch on the kind without matching
/// every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Score or limit proof rejected
    Proof,
    /// Value outside a configured range
    Bounds,
    /// Deposit, borrow or swap limit exceeded
    Limit,
    /// Collateralization or liquidation check failed
    Solvency,
    /// Price too old or zero
    Freshness,
    /// Paused, already initialized, or caller lacks the required role
    State,
    /// Unknown or unsupported asset
    Asset,
    /// Overflow, division by zero, negative amount
    Arithmetic,
    /// Token transfer failed
    Transfer,
    /// Storage, serialization, channel or config failure
    Infrastructure,
}

impl ErrorKind {
    /// Stable lowercase label (used as a metrics label)
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Proof => "proof",
            ErrorKind::Bounds => "bounds",
            ErrorKind::Limit => "limit",
            ErrorKind::Solvency => "solvency",
            ErrorKind::Freshness => "freshness",
            ErrorKind::State => "state",
            ErrorKind::Asset => "asset",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Transfer => "transfer",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
