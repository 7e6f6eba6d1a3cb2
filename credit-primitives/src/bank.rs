//! Token bank collaborator
//!
//! The ledger never holds balances itself. It hands a batch of transfers to
//! a `TokenBank`, which applies them all or none.

use crate::error::ErrorKind;
use crate::math::{precision_scalar, MathError};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// One token movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Token being moved
    pub asset: Address,
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Amount in the token's native units
    pub amount: u128,
}

impl Transfer {
    /// Create a transfer
    pub fn new(asset: Address, from: Address, to: Address, amount: u128) -> Self {
        Self {
            asset,
            from,
            to,
            amount,
        }
    }
}

/// Bank errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    /// Token not registered
    #[error("unknown token: {0}")]
    UnknownToken(Address),

    /// Sender balance too low
    #[error("insufficient {asset} balance for {holder}: have {balance}, need {required}")]
    InsufficientBalance {
        /// Token
        asset: Address,
        /// Sender
        holder: Address,
        /// Current balance
        balance: u128,
        /// Amount required
        required: u128,
    },

    /// Recipient balance would overflow
    #[error("balance overflow")]
    Overflow,

    /// Token decimals out of range
    #[error("math error: {0}")]
    Math(#[from] MathError),
}

impl BankError {
    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::UnknownToken(_) => ErrorKind::Asset,
            BankError::InsufficientBalance { .. } => ErrorKind::Transfer,
            BankError::Overflow | BankError::Math(_) => ErrorKind::Arithmetic,
        }
    }
}

/// Token collaborator interface
pub trait TokenBank: Send + fmt::Debug {
    /// Token decimals (fails for unknown tokens)
    fn decimals(&self, asset: &Address) -> Result<u8, BankError>;

    /// Balance of `holder`
    fn balance_of(&self, asset: &Address, holder: &Address) -> u128;

    /// Apply every transfer, or none if any fails
    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), BankError>;
}

/// In-memory token bank
#[derive(Debug, Default, Clone)]
pub struct InMemoryBank {
    decimals: HashMap<Address, u8>,
    balances: HashMap<(Address, Address), u128>,
}

impl InMemoryBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token (decimals above 18 are rejected)
    pub fn register_token(&mut self, asset: Address, decimals: u8) -> Result<(), BankError> {
        precision_scalar(decimals)?;
        self.decimals.insert(asset, decimals);
        Ok(())
    }

    /// Credit `amount` to `holder` out of thin air
    pub fn mint(&mut self, asset: Address, holder: Address, amount: u128) -> Result<(), BankError> {
        if !self.decimals.contains_key(&asset) {
            return Err(BankError::UnknownToken(asset));
        }
        let balance = self.balances.entry((asset, holder)).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(BankError::Overflow)?;
        Ok(())
    }
}

impl TokenBank for InMemoryBank {
    fn decimals(&self, asset: &Address) -> Result<u8, BankError> {
        self.decimals
            .get(asset)
            .copied()
            .ok_or(BankError::UnknownToken(*asset))
    }

    fn balance_of(&self, asset: &Address, holder: &Address) -> u128 {
        self.balances.get(&(*asset, *holder)).copied().unwrap_or(0)
    }

    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), BankError> {
        // Apply to a scratch copy of the touched balances, then publish
        let mut scratch: BTreeMap<(Address, Address), u128> = BTreeMap::new();

        for transfer in transfers {
            if !self.decimals.contains_key(&transfer.asset) {
                return Err(BankError::UnknownToken(transfer.asset));
            }
            if transfer.amount == 0 || transfer.from == transfer.to {
                continue;
            }

            let from_key = (transfer.asset, transfer.from);
            let from_balance = *scratch
                .entry(from_key)
                .or_insert_with(|| self.balance_of(&transfer.asset, &transfer.from));
            if from_balance < transfer.amount {
                return Err(BankError::InsufficientBalance {
                    asset: transfer.asset,
                    holder: transfer.from,
                    balance: from_balance,
                    required: transfer.amount,
                });
            }
            scratch.insert(from_key, from_balance - transfer.amount);

            let to_key = (transfer.asset, transfer.to);
            let to_balance = *scratch
                .entry(to_key)
                .or_insert_with(|| self.balance_of(&transfer.asset, &transfer.to));
            let credited = to_balance
                .checked_add(transfer.amount)
                .ok_or(BankError::Overflow)?;
            scratch.insert(to_key, credited);
        }

        for (key, balance) in scratch {
            self.balances.insert(key, balance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (InMemoryBank, Address, Address, Address) {
        let usdc = Address::from_label("usdc");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut bank = InMemoryBank::new();
        bank.register_token(usdc, 6).unwrap();
        bank.mint(usdc, alice, 100).unwrap();
        (bank, usdc, alice, bob)
    }

    #[test]
    fn test_settle_moves_balances() {
        let (mut bank, usdc, alice, bob) = setup();
        bank.settle(&[Transfer::new(usdc, alice, bob, 40)]).unwrap();
        assert_eq!(bank.balance_of(&usdc, &alice), 60);
        assert_eq!(bank.balance_of(&usdc, &bob), 40);
    }

    #[test]
    fn test_settle_is_all_or_nothing() {
        let (mut bank, usdc, alice, bob) = setup();
        let batch = [
            Transfer::new(usdc, alice, bob, 80),
            Transfer::new(usdc, alice, bob, 30),
        ];
        let err = bank.settle(&batch).unwrap_err();
        assert!(matches!(err, BankError::InsufficientBalance { balance: 20, .. }));
        assert_eq!(bank.balance_of(&usdc, &alice), 100);
        assert_eq!(bank.balance_of(&usdc, &bob), 0);
    }

    #[test]
    fn test_chained_transfers_use_pending_balances() {
        let (mut bank, usdc, alice, bob) = setup();
        let carol = Address::from_label("carol");
        bank.settle(&[
            Transfer::new(usdc, alice, bob, 100),
            Transfer::new(usdc, bob, carol, 100),
        ])
        .unwrap();
        assert_eq!(bank.balance_of(&usdc, &carol), 100);
        assert_eq!(bank.balance_of(&usdc, &bob), 0);
    }

    #[test]
    fn test_unknown_token_and_decimals() {
        let (mut bank, _, alice, bob) = setup();
        let dai = Address::from_label("dai");
        assert_eq!(
            bank.settle(&[Transfer::new(dai, alice, bob, 1)]).unwrap_err(),
            BankError::UnknownToken(dai)
        );
        assert!(bank.register_token(dai, 19).is_err());
        assert_eq!(bank.decimals(&dai).unwrap_err().kind(), ErrorKind::Asset);
    }
}
