//! Error types for the vault ledger

use assessor::AssessorError;
use credit_primitives::{Address, BankError, ErrorKind, MathError, ProtocolTag, Unauthorized};
use liquidity_pool::PoolError;
use score_registry::RegistryError;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger is paused
    #[error("Ledger is paused")]
    Paused,

    /// Ledger registered twice
    #[error("Ledger already initialized: {0}")]
    AlreadyInitialized(Address),

    /// No ledger with this ID
    #[error("Unknown ledger: {0}")]
    UnknownLedger(Address),

    /// Oracle returned a zero price
    #[error("Oracle price is zero")]
    ZeroPrice,

    /// Oracle price older than the staleness window
    #[error("Stale price: observed at {observed}, now {now}, max staleness {max_staleness}s")]
    StalePrice {
        /// Price timestamp
        observed: u64,
        /// Call timestamp
        now: u64,
        /// Allowed age
        max_staleness: u64,
    },

    /// Zero amount
    #[error("Amount must be positive")]
    ZeroAmount,

    /// Proof names another account
    #[error("Proof account mismatch: expected {expected}, got {actual}")]
    ProofAccountMismatch {
        /// Account the proof should name
        expected: Address,
        /// Account it names
        actual: Address,
    },

    /// Proof carries the wrong protocol tag
    #[error("Wrong proof protocol: expected {expected}, got {actual}")]
    WrongProtocol {
        /// Required tag
        expected: ProtocolTag,
        /// Supplied tag
        actual: ProtocolTag,
    },

    /// No verified limit proof and no default limit
    #[error("Invalid proof")]
    InvalidProof,

    /// Debt would exceed the account's borrow limit
    #[error("Borrow limit exceeded: debt {debt} > limit {limit}")]
    BorrowLimitExceeded {
        /// Resulting debt
        debt: u128,
        /// Applicable limit
        limit: u128,
    },

    /// Ledger debt would exceed its total limit
    #[error("Total borrow limit exceeded: {total} > {limit}")]
    TotalBorrowLimitExceeded {
        /// Resulting ledger debt
        total: u128,
        /// Configured limit
        limit: u128,
    },

    /// Vault debt below the minimum
    #[error("Vault debt {debt} below minimum {minimum}")]
    BelowVaultMinimum {
        /// Resulting vault debt
        debt: u128,
        /// Configured minimum
        minimum: u128,
    },

    /// Vault debt above the maximum
    #[error("Vault debt {debt} above maximum {maximum}")]
    AboveVaultMaximum {
        /// Resulting vault debt
        debt: u128,
        /// Configured maximum
        maximum: u128,
    },

    /// Collateral value below the assessed requirement
    #[error("Undercollateralized: collateral value {collateral_value} < required {required}")]
    Undercollateralized {
        /// Collateral value in credits
        collateral_value: u128,
        /// Debt times the assessed c-ratio
        required: u128,
    },

    /// Vault owes nothing
    #[error("Nothing to repay")]
    NothingToRepay,

    /// Repayment larger than the debt
    #[error("Repay amount {amount} exceeds debt {debt}")]
    RepayExceedsDebt {
        /// Outstanding debt
        debt: u128,
        /// Amount offered
        amount: u128,
    },

    /// Withdrawal larger than the collateral
    #[error("Insufficient collateral: available {available}, requested {requested}")]
    InsufficientCollateral {
        /// Collateral held
        available: u128,
        /// Amount requested
        requested: u128,
    },

    /// Vault is adequately collateralized
    #[error("Vault is not liquidatable")]
    NotLiquidatable,

    /// Parameter set rejected
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] Unauthorized),

    /// Score registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Assessor error
    #[error("Assessor error: {0}")]
    Assessor(#[from] AssessorError),

    /// Liquidity pool error
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Token transfer error
    #[error("Bank error: {0}")]
    Bank(#[from] BankError),

    /// Arithmetic error
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ProofAccountMismatch { .. } | Error::WrongProtocol { .. } | Error::InvalidProof => {
                ErrorKind::Proof
            }
            Error::BorrowLimitExceeded { .. }
            | Error::TotalBorrowLimitExceeded { .. }
            | Error::BelowVaultMinimum { .. }
            | Error::AboveVaultMaximum { .. } => ErrorKind::Limit,
            Error::Undercollateralized { .. }
            | Error::NothingToRepay
            | Error::RepayExceedsDebt { .. }
            | Error::InsufficientCollateral { .. }
            | Error::NotLiquidatable => ErrorKind::Solvency,
            Error::ZeroPrice | Error::StalePrice { .. } => ErrorKind::Freshness,
            Error::Paused
            | Error::AlreadyInitialized(_)
            | Error::UnknownLedger(_)
            | Error::Unauthorized(_) => ErrorKind::State,
            Error::ZeroAmount | Error::InvalidParams(_) => ErrorKind::Bounds,
            Error::Registry(e) => e.kind(),
            Error::Assessor(e) => e.kind(),
            Error::Pool(e) => e.kind(),
            Error::Bank(e) => e.kind(),
            Error::Math(_) => ErrorKind::Arithmetic,
            Error::Storage(_)
            | Error::Serialization(_)
            | Error::Concurrency(_)
            | Error::Config(_)
            | Error::Io(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
