//! Borrow index accounting
//!
//! Debt is stored normalized: `normalized = debt / index` at the time it was
//! incurred. Multiplying by the current index yields debt with interest.
//! Debt rounds up; the index itself rounds up on every accrual.

use credit_primitives::math::{div_amount, mul_amount, round_ratio};
use credit_primitives::{MathError, Rounding};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger-wide cumulative interest multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowIndex {
    value: Decimal,
    last_update: u64,
}

impl BorrowIndex {
    /// Index of 1.0 starting at `now`
    pub fn new(now: u64) -> Self {
        Self {
            value: Decimal::ONE,
            last_update: now,
        }
    }

    /// Index advanced to `now` at `rate` per second
    ///
    /// Simple interest over the elapsed window, compounded per accrual.
    /// Timestamps at or before the last update leave the index unchanged.
    pub fn accrued(&self, rate: Decimal, now: u64) -> Result<Self, MathError> {
        if now <= self.last_update {
            return Ok(*self);
        }
        let elapsed = Decimal::from(now - self.last_update);
        let growth = rate
            .checked_mul(elapsed)
            .and_then(|r| r.checked_add(Decimal::ONE))
            .ok_or(MathError::Overflow("accrue"))?;
        let value = self
            .value
            .checked_mul(growth)
            .ok_or(MathError::Overflow("accrue"))?;

        Ok(Self {
            value: round_ratio(value, Rounding::Up),
            last_update: now,
        })
    }

    /// Current debt for a normalized amount (rounded up)
    pub fn denormalize(&self, normalized: u128) -> Result<u128, MathError> {
        mul_amount(normalized, self.value, Rounding::Up)
    }

    /// Normalized amount for a debt
    pub fn normalize(&self, amount: u128, rounding: Rounding) -> Result<u128, MathError> {
        div_amount(amount, self.value, rounding)
    }

    /// Index value
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Timestamp of the last accrual
    pub fn last_update(&self) -> u64 {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accrual_is_simple_per_window() {
        let index = BorrowIndex::new(0);
        let later = index.accrued(dec!(0.001), 100).unwrap();
        assert_eq!(later.value(), dec!(1.1));
        assert_eq!(later.last_update(), 100);
    }

    #[test]
    fn test_past_timestamp_is_noop() {
        let index = BorrowIndex::new(0).accrued(dec!(0.001), 100).unwrap();
        assert_eq!(index.accrued(dec!(0.001), 50).unwrap(), index);
    }

    #[test]
    fn test_zero_rate_keeps_index() {
        let index = BorrowIndex::new(10).accrued(Decimal::ZERO, 1_000).unwrap();
        assert_eq!(index.value(), Decimal::ONE);
    }

    #[test]
    fn test_denormalize_rounds_up() {
        let index = BorrowIndex::new(0).accrued(dec!(0.001), 100).unwrap();
        // 7 * 1.1 = 7.7
        assert_eq!(index.denormalize(7).unwrap(), 8);
        // 10 / 1.1 = 9.09
        assert_eq!(index.normalize(10, Rounding::Up).unwrap(), 10);
        assert_eq!(index.normalize(10, Rounding::Down).unwrap(), 9);
    }
}
