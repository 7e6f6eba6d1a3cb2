//! Ledger events for external observers

use credit_primitives::Address;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State change emitted by a successful operation
///
/// Amounts are 18-decimal credits unless noted; `collateral_amount` and
/// `debt` are the vault totals after the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Collateral deposited
    Deposited {
        /// Vault owner
        account: Address,
        /// Collateral added (native units)
        amount: u128,
        /// Collateral after
        collateral_amount: u128,
        /// Debt after
        debt: u128,
    },

    /// Credits borrowed and paid out in a stablecoin
    Borrowed {
        /// Vault owner
        account: Address,
        /// Stablecoin paid out
        asset: Address,
        /// Credits borrowed
        amount: u128,
        /// Borrow fee added to debt
        fee: u128,
        /// Stables received (native units)
        stables_out: u128,
        /// Collateral after
        collateral_amount: u128,
        /// Principal after
        principal: u128,
        /// Debt after
        debt: u128,
    },

    /// Debt repaid in a stablecoin
    Repaid {
        /// Vault owner
        account: Address,
        /// Stablecoin paid in
        asset: Address,
        /// Credits repaid
        amount: u128,
        /// Portion covering interest
        interest_paid: u128,
        /// Portion covering principal
        principal_paid: u128,
        /// Stables paid (native units)
        stables_in: u128,
        /// Principal after
        principal: u128,
        /// Debt after
        debt: u128,
    },

    /// Collateral withdrawn
    Withdrawn {
        /// Vault owner
        account: Address,
        /// Collateral removed (native units)
        amount: u128,
        /// Collateral after
        collateral_amount: u128,
        /// Debt after
        debt: u128,
    },

    /// Vault liquidated
    Liquidated {
        /// Vault owner
        account: Address,
        /// Caller who repaid
        liquidator: Address,
        /// Stablecoin paid in
        asset: Address,
        /// Credits repaid
        repaid: u128,
        /// Collateral taken from the vault (native units)
        collateral_seized: u128,
        /// Collateral sent to the fee collector (native units)
        arc_fee: u128,
        /// Collateral after
        collateral_amount: u128,
        /// Debt after
        debt: u128,
    },
}

impl LedgerEvent {
    /// Vault owner the event concerns
    pub fn account(&self) -> Address {
        match self {
            LedgerEvent::Deposited { account, .. }
            | LedgerEvent::Borrowed { account, .. }
            | LedgerEvent::Repaid { account, .. }
            | LedgerEvent::Withdrawn { account, .. }
            | LedgerEvent::Liquidated { account, .. } => *account,
        }
    }

    /// Short name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Deposited { .. } => "deposit",
            LedgerEvent::Borrowed { .. } => "borrow",
            LedgerEvent::Repaid { .. } => "repay",
            LedgerEvent::Withdrawn { .. } => "withdraw",
            LedgerEvent::Liquidated { .. } => "liquidate",
        }
    }
}

/// Journal entry wrapping an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique ID (UUIDv7, time-ordered)
    pub id: Uuid,

    /// Position in the market's total order
    pub sequence: u64,

    /// Ledger that emitted the event
    pub ledger: Address,

    /// Call timestamp
    pub timestamp: u64,

    /// Event body
    pub event: LedgerEvent,
}

impl EventRecord {
    /// Wrap an event
    pub fn new(sequence: u64, ledger: Address, timestamp: u64, event: LedgerEvent) -> Self {
        Self {
            id: Uuid::now_v7(),
            sequence,
            ledger,
            timestamp,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrowed() -> LedgerEvent {
        LedgerEvent::Borrowed {
            account: Address::from_label("alice"),
            asset: Address::from_label("usdc"),
            amount: 5_000 * credit_primitives::WAD,
            fee: 0,
            stables_out: 5_000_000_000,
            collateral_amount: 1_000 * credit_primitives::WAD,
            principal: 5_000 * credit_primitives::WAD,
            debt: 5_000 * credit_primitives::WAD,
        }
    }

    #[test]
    fn test_json_uses_hex_addresses() {
        let event = borrowed();
        let json = serde_json::to_value(&event).unwrap();
        let body = &json["Borrowed"];
        assert_eq!(
            body["account"],
            serde_json::Value::String(Address::from_label("alice").to_string())
        );
        assert!(body["account"].as_str().unwrap().starts_with("0x"));
        assert_eq!(event.name(), "borrow");
    }

    #[test]
    fn test_record_bincode_matches_journal_format() {
        let record = EventRecord::new(7, Address::from_label("ledger"), 1_700_000_000, borrowed());
        let bytes = bincode::serialize(&record).unwrap();
        let decoded: EventRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.event.account(), Address::from_label("alice"));
        assert_eq!(decoded.id.get_version_num(), 7);
    }
}
