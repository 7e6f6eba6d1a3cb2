//! Pool data types

use credit_primitives::Address;
use serde::{Deserialize, Serialize};

/// Limit and current usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilization {
    /// Configured cap
    pub limit: u128,

    /// Amount currently counted against the cap
    pub amount_used: u128,
}

impl Utilization {
    /// Create with a limit and nothing used
    pub fn with_limit(limit: u128) -> Self {
        Self {
            limit,
            amount_used: 0,
        }
    }

    /// Room left under the limit
    pub fn headroom(&self) -> u128 {
        self.limit.saturating_sub(self.amount_used)
    }
}

/// Per-asset pool state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetState {
    /// Deposit limit and usage (native units)
    pub utilization: Utilization,

    /// Tokens held by the pool (native units)
    pub reserve: u128,

    /// Token decimals
    pub decimals: u8,

    /// Multiplier to 18 decimals
    pub scalar: u128,
}

/// Direction of a ledger swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Ledger hands credits to the pool and receives stables (borrow)
    CreditsForStables,
    /// Ledger returns stables and takes credits back (repay)
    StablesForCredits,
}

/// Validated swap awaiting commit
///
/// Only `LiquidityPool::plan_swap` creates one, and `commit_swap` consumes
/// it, so a plan is applied at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct SwapPlan {
    pub(crate) core: Address,
    pub(crate) direction: SwapDirection,
    pub(crate) asset: Address,
    pub(crate) credit_amount: u128,
    pub(crate) stable_amount: u128,
}

impl SwapPlan {
    /// Ledger performing the swap
    pub fn core(&self) -> Address {
        self.core
    }

    /// Swap direction
    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    /// Stablecoin moved
    pub fn asset(&self) -> Address {
        self.asset
    }

    /// Credits moved (18 decimals)
    pub fn credit_amount(&self) -> u128 {
        self.credit_amount
    }

    /// Stables moved (native units)
    pub fn stable_amount(&self) -> u128 {
        self.stable_amount
    }
}

/// Validated LP interest payment awaiting commit
#[derive(Debug, PartialEq, Eq)]
pub struct InterestPlan {
    pub(crate) asset: Address,
    pub(crate) amount: u128,
}

impl InterestPlan {
    /// Stablecoin paid
    pub fn asset(&self) -> Address {
        self.asset
    }

    /// Amount paid (native units)
    pub fn amount(&self) -> u128 {
        self.amount
    }
}

/// What a share redemption pays out in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawTarget {
    /// Entirely in one asset
    Asset(Address),
    /// Split across reserves by their share of the total
    Proportional,
}
