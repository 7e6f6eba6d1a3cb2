//! Vault ledger data types

use credit_primitives::{Address, ProtocolTag};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One account's position in one ledger
///
/// `normalized_borrowed == 0` implies `principal == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Collateral held (native units)
    pub collateral_amount: u128,

    /// Borrowed credits before interest (18 decimals)
    pub principal: u128,

    /// Debt divided by the borrow index at last touch
    pub normalized_borrowed: u128,
}

impl Vault {
    /// True when nothing is deposited or owed
    pub fn is_empty(&self) -> bool {
        self.collateral_amount == 0 && self.normalized_borrowed == 0
    }
}

/// Vault plus its debt at the ledger's current index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultView {
    /// Stored vault
    pub vault: Vault,

    /// Outstanding debt (18 decimals)
    pub debt: u128,
}

/// Ledger parameters
///
/// Ratios, rates and fees are decimals; amounts are 18-decimal credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Collateral token
    pub collateral_asset: Address,

    /// Best c-ratio a perfect score can reach
    pub low_c_ratio: Decimal,

    /// C-ratio without a verified score
    pub high_c_ratio: Decimal,

    /// Interest per second
    pub interest_rate: Decimal,

    /// Fee added to each borrow, as a fraction of the amount
    pub borrow_fee: Decimal,

    /// Fraction of repaid interest going to pool LPs
    pub pool_interest_share: Decimal,

    /// Collateral price discount offered to liquidators
    pub liquidator_discount: Decimal,

    /// Fraction of the liquidation discount taken as a protocol fee
    pub liquidation_arc_fee: Decimal,

    /// Oldest acceptable price (seconds)
    pub max_price_staleness: u64,

    /// Cap on total ledger debt
    pub total_borrow_limit: u128,

    /// Smallest non-zero vault debt
    pub vault_borrow_minimum: u128,

    /// Largest vault debt
    pub vault_borrow_maximum: u128,

    /// Borrow limit without a verified limit proof (`None`: proof required)
    pub default_borrow_limit: Option<u128>,

    /// Tag of credit score proofs
    pub credit_protocol: ProtocolTag,

    /// Tag of borrow limit proofs
    pub limit_protocol: ProtocolTag,

    /// Receives the protocol's share of interest and liquidation fees
    pub fee_collector: Address,

    /// Require a credit proof on every borrow
    pub borrow_score_required: bool,
}

impl LedgerParams {
    /// Parameters with no fees, no interest and open limits
    pub fn new(
        collateral_asset: Address,
        low_c_ratio: Decimal,
        high_c_ratio: Decimal,
        fee_collector: Address,
    ) -> Self {
        Self {
            collateral_asset,
            low_c_ratio,
            high_c_ratio,
            interest_rate: Decimal::ZERO,
            borrow_fee: Decimal::ZERO,
            pool_interest_share: Decimal::ONE,
            liquidator_discount: Decimal::new(1, 1),
            liquidation_arc_fee: Decimal::ZERO,
            max_price_staleness: 3_600,
            total_borrow_limit: u128::MAX,
            vault_borrow_minimum: 0,
            vault_borrow_maximum: u128::MAX,
            default_borrow_limit: Some(u128::MAX),
            credit_protocol: ProtocolTag::from_label("arcx.credit"),
            limit_protocol: ProtocolTag::from_label("arcx.limit"),
            fee_collector,
            borrow_score_required: false,
        }
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.low_c_ratio <= Decimal::ZERO || self.high_c_ratio <= self.low_c_ratio {
            return Err(format!(
                "c-ratios must satisfy 0 < low ({}) < high ({})",
                self.low_c_ratio, self.high_c_ratio
            ));
        }
        if self.interest_rate.is_sign_negative() || self.borrow_fee.is_sign_negative() {
            return Err("interest rate and borrow fee must be non-negative".to_string());
        }
        for (name, value) in [
            ("pool_interest_share", self.pool_interest_share),
            ("liquidation_arc_fee", self.liquidation_arc_fee),
        ] {
            if value.is_sign_negative() || value > Decimal::ONE {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.liquidator_discount.is_sign_negative() || self.liquidator_discount >= Decimal::ONE {
            return Err(format!(
                "liquidator_discount must be within [0, 1), got {}",
                self.liquidator_discount
            ));
        }
        if self.vault_borrow_minimum > self.vault_borrow_maximum {
            return Err("vault borrow minimum above maximum".to_string());
        }
        if self.credit_protocol == self.limit_protocol {
            return Err("credit and limit protocols must differ".to_string());
        }
        Ok(())
    }
}
