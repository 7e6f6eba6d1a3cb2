//! Error types for the liquidity pool

use credit_primitives::{Address, BankError, ErrorKind, MathError, Unauthorized};
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Pool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] Unauthorized),

    /// Asset not in the supported list
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(Address),

    /// Ledger has no swap limit configured
    #[error("Unknown core: {0}")]
    UnknownCore(Address),

    /// Asset deposit limit would be exceeded
    #[error("Deposit limit exceeded for {asset}: used {used} + {amount} > {limit}")]
    DepositLimitExceeded {
        /// Asset
        asset: Address,
        /// Current utilization
        used: u128,
        /// Requested amount
        amount: u128,
        /// Configured limit
        limit: u128,
    },

    /// Ledger swap limit would be exceeded
    #[error("Core swap limit exceeded for {core}: used {used} + {amount} > {limit}")]
    CoreSwapLimitExceeded {
        /// Ledger
        core: Address,
        /// Current utilization
        used: u128,
        /// Requested amount
        amount: u128,
        /// Configured limit
        limit: u128,
    },

    /// Pool holds too little of the asset
    #[error("Insufficient liquidity in {asset}: available {available}, required {required}")]
    InsufficientLiquidity {
        /// Asset
        asset: Address,
        /// Reserve
        available: u128,
        /// Amount asked for
        required: u128,
    },

    /// Stable reserves cannot cover a proportional redemption
    #[error("Insufficient reserves: available {available}, required {required}")]
    InsufficientReserves {
        /// Total reserves (18 decimals)
        available: u128,
        /// Value redeemed (18 decimals)
        required: u128,
    },

    /// Holder owns fewer shares than requested
    #[error("Insufficient shares: available {available}, required {required}")]
    InsufficientShares {
        /// Shares held
        available: u128,
        /// Shares requested
        required: u128,
    },

    /// Asset cannot be removed while deposits are outstanding
    #[error("Asset {asset} still in use: {amount_used}")]
    AssetInUse {
        /// Asset
        asset: Address,
        /// Outstanding utilization
        amount_used: u128,
    },

    /// New limit would sit below current utilization
    #[error("Limit {limit} below current utilization {used}")]
    LimitBelowUtilization {
        /// Current utilization
        used: u128,
        /// Requested limit
        limit: u128,
    },

    /// Zero amount
    #[error("Amount must be positive")]
    ZeroAmount,

    /// Token transfer failed
    #[error("Bank error: {0}")]
    Bank(#[from] BankError),

    /// Arithmetic failure
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl PoolError {
    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::Unauthorized(_) | PoolError::UnknownCore(_) => ErrorKind::State,
            PoolError::UnsupportedAsset(_) | PoolError::AssetInUse { .. } => ErrorKind::Asset,
            PoolError::DepositLimitExceeded { .. }
            | PoolError::CoreSwapLimitExceeded { .. }
            | PoolError::InsufficientLiquidity { .. }
            | PoolError::InsufficientReserves { .. }
            | PoolError::LimitBelowUtilization { .. } => ErrorKind::Limit,
            PoolError::InsufficientShares { .. } => ErrorKind::Solvency,
            PoolError::ZeroAmount => ErrorKind::Bounds,
            PoolError::Bank(e) => e.kind(),
            PoolError::Math(_) => ErrorKind::Arithmetic,
        }
    }
}
