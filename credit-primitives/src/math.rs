//! Fixed-point helpers
//!
//! Token amounts are `u128` base units. Ratios, prices, indices and fees are
//! `Decimal` values held at 18 decimal places; amount arithmetic scales them
//! to 18-decimal integers and stays on `u128` with a 256-bit intermediate.
//! Every conversion names its rounding direction: amounts owed to the
//! protocol round up, amounts owed to users round down.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Internal precision (decimal places) of the ledger's credit unit
pub const WAD_DECIMALS: u8 = 18;

/// One whole unit at 18 decimals
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Arithmetic errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    /// Result does not fit
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// Divisor was zero
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    /// Negative value where an amount was expected
    #[error("negative result in {0}")]
    Negative(&'static str),

    /// Token with more than 18 decimals
    #[error("unsupported token decimals: {0} (max 18)")]
    UnsupportedDecimals(u8),
}

/// Rounding direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero (amounts owed to users)
    Down,
    /// Away from zero (amounts owed to the protocol)
    Up,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::Down => RoundingStrategy::ToZero,
            Rounding::Up => RoundingStrategy::AwayFromZero,
        }
    }
}

/// Convert a base-unit amount to a decimal
pub fn to_decimal(amount: u128) -> Result<Decimal, MathError> {
    let wide = i128::try_from(amount).map_err(|_| MathError::Overflow("to_decimal"))?;
    Decimal::try_from_i128_with_scale(wide, 0).map_err(|_| MathError::Overflow("to_decimal"))
}

/// Round a decimal to a whole base-unit amount
pub fn to_amount(value: Decimal, rounding: Rounding) -> Result<u128, MathError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MathError::Negative("to_amount"));
    }
    let rounded = value.round_dp_with_strategy(0, rounding.strategy());
    // Rounding to zero places leaves any residual scale as trailing zeros
    let divisor = 10i128
        .checked_pow(rounded.scale())
        .ok_or(MathError::Overflow("to_amount"))?;
    u128::try_from(rounded.mantissa() / divisor).map_err(|_| MathError::Overflow("to_amount"))
}

/// Round a ratio to 18 decimal places
pub fn round_ratio(value: Decimal, rounding: Rounding) -> Decimal {
    value.round_dp_with_strategy(WAD_DECIMALS as u32, rounding.strategy())
}

/// Decimal ratio as an 18-decimal integer
///
/// Ratios carrying more than 18 places round in the given direction.
pub fn ratio_to_wad(factor: Decimal, rounding: Rounding) -> Result<u128, MathError> {
    if factor.is_sign_negative() && !factor.is_zero() {
        return Err(MathError::Negative("ratio_to_wad"));
    }
    let rounded = round_ratio(factor, rounding);
    let mantissa =
        u128::try_from(rounded.mantissa()).map_err(|_| MathError::Negative("ratio_to_wad"))?;
    let scale = rounded.scale();
    let places = u32::from(WAD_DECIMALS);
    if scale <= places {
        let shift = 10u128.pow(places - scale);
        mantissa
            .checked_mul(shift)
            .ok_or(MathError::Overflow("ratio_to_wad"))
    } else {
        // Residual trailing zeros past 18 places
        Ok(mantissa / 10u128.pow(scale - places))
    }
}

/// 18-decimal integer back to a decimal ratio
///
/// Ratios too large for 18 places in a `Decimal` mantissa keep as many
/// places as fit, truncating the rest.
pub fn wad_to_ratio(wad: u128) -> Result<Decimal, MathError> {
    let mut mantissa = wad;
    for scale in (0..=u32::from(WAD_DECIMALS)).rev() {
        if let Ok(wide) = i128::try_from(mantissa) {
            if let Ok(value) = Decimal::try_from_i128_with_scale(wide, scale) {
                return Ok(value.normalize());
            }
        }
        mantissa /= 10;
    }
    Err(MathError::Overflow("wad_to_ratio"))
}

/// `amount * factor`, rounded to base units
pub fn mul_amount(amount: u128, factor: Decimal, rounding: Rounding) -> Result<u128, MathError> {
    mul_div(amount, ratio_to_wad(factor, rounding)?, WAD, rounding)
}

/// `amount / divisor`, rounded to base units
pub fn div_amount(amount: u128, divisor: Decimal, rounding: Rounding) -> Result<u128, MathError> {
    // A smaller divisor gives a larger quotient
    let toward = match rounding {
        Rounding::Down => Rounding::Up,
        Rounding::Up => Rounding::Down,
    };
    let divisor = ratio_to_wad(divisor, toward)?;
    if divisor == 0 {
        return Err(MathError::DivisionByZero("div_amount"));
    }
    mul_div(amount, WAD, divisor, rounding)
}

/// `numerator / denominator` as a decimal ratio at 18 places
pub fn ratio_of(numerator: u128, denominator: u128, rounding: Rounding) -> Result<Decimal, MathError> {
    wad_to_ratio(mul_div(numerator, WAD, denominator, rounding)?)
}

/// `a * b / c` on base units with a 256-bit intermediate
///
/// Fails only when the quotient itself does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, c: u128, rounding: Rounding) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero("mul_div"));
    }
    let (hi, lo) = widening_mul(a, b);
    if hi >= c {
        return Err(MathError::Overflow("mul_div"));
    }
    let (quotient, remainder) = div_wide(hi, lo, c);
    match rounding {
        Rounding::Up if remainder != 0 => quotient
            .checked_add(1)
            .ok_or(MathError::Overflow("mul_div")),
        _ => Ok(quotient),
    }
}

const LOW_HALF: u128 = u64::MAX as u128;

/// Full 256-bit product as (high, low) words
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a1, a0) = (a >> 64, a & LOW_HALF);
    let (b1, b0) = (b >> 64, b & LOW_HALF);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    // At most 3 * (2^64 - 1), no overflow
    let mid = (p00 >> 64) + (p01 & LOW_HALF) + (p10 & LOW_HALF);
    let lo = (p00 & LOW_HALF) | (mid << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divide the 256-bit value (hi, lo) by `divisor`; requires `hi < divisor`
fn div_wide(hi: u128, lo: u128, divisor: u128) -> (u128, u128) {
    if hi == 0 {
        return (lo / divisor, lo % divisor);
    }
    let mut remainder = hi;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = remainder >> 127;
        remainder = (remainder << 1) | ((lo >> bit) & 1);
        // With the carry the true remainder exceeds 2^128 > divisor
        if carry == 1 || remainder >= divisor {
            remainder = remainder.wrapping_sub(divisor);
            quotient |= 1 << bit;
        }
    }
    (quotient, remainder)
}

/// Multiplier bringing a token with `decimals` to 18 decimals
///
/// Computed once when the token is registered.
pub fn precision_scalar(decimals: u8) -> Result<u128, MathError> {
    if decimals > WAD_DECIMALS {
        return Err(MathError::UnsupportedDecimals(decimals));
    }
    10u128
        .checked_pow(u32::from(WAD_DECIMALS - decimals))
        .ok_or(MathError::Overflow("precision_scalar"))
}

/// Native token amount to 18-decimal units
pub fn to_wad(amount: u128, scalar: u128) -> Result<u128, MathError> {
    amount.checked_mul(scalar).ok_or(MathError::Overflow("to_wad"))
}

/// 18-decimal units to native token amount
pub fn from_wad(amount: u128, scalar: u128, rounding: Rounding) -> Result<u128, MathError> {
    if scalar == 0 {
        return Err(MathError::DivisionByZero("from_wad"));
    }
    let whole = amount / scalar;
    match rounding {
        Rounding::Up if amount % scalar != 0 => {
            whole.checked_add(1).ok_or(MathError::Overflow("from_wad"))
        }
        _ => Ok(whole),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_precision_scalar() {
        assert_eq!(precision_scalar(18).unwrap(), 1);
        assert_eq!(precision_scalar(6).unwrap(), 1_000_000_000_000);
        assert_eq!(
            precision_scalar(19).unwrap_err(),
            MathError::UnsupportedDecimals(19)
        );
    }

    #[test]
    fn test_mul_amount_rounding_direction() {
        // 10 * 0.15 = 1.5
        assert_eq!(mul_amount(10, dec!(0.15), Rounding::Down).unwrap(), 1);
        assert_eq!(mul_amount(10, dec!(0.15), Rounding::Up).unwrap(), 2);
        // Exact products are unaffected
        assert_eq!(mul_amount(10, dec!(0.5), Rounding::Up).unwrap(), 5);
    }

    #[test]
    fn test_div_amount() {
        assert_eq!(div_amount(10, dec!(3), Rounding::Down).unwrap(), 3);
        assert_eq!(div_amount(10, dec!(3), Rounding::Up).unwrap(), 4);
        assert!(div_amount(10, Decimal::ZERO, Rounding::Down).is_err());
    }

    #[test]
    fn test_large_wad_amounts() {
        // 1,000,000 tokens at 18 decimals times a price of 10
        let amount = 1_000_000 * WAD;
        assert_eq!(
            mul_amount(amount, dec!(10), Rounding::Down).unwrap(),
            10_000_000 * WAD
        );
    }

    #[test]
    fn test_from_wad_rounding() {
        let scalar = precision_scalar(6).unwrap();
        assert_eq!(from_wad(scalar + 1, scalar, Rounding::Down).unwrap(), 1);
        assert_eq!(from_wad(scalar + 1, scalar, Rounding::Up).unwrap(), 2);
        assert_eq!(from_wad(scalar, scalar, Rounding::Up).unwrap(), 1);
    }

    #[test]
    fn test_mul_div() {
        assert_eq!(mul_div(7, 3, 2, Rounding::Down).unwrap(), 10);
        assert_eq!(mul_div(7, 3, 2, Rounding::Up).unwrap(), 11);
        assert!(mul_div(1, 1, 0, Rounding::Down).is_err());
    }

    #[test]
    fn test_amounts_beyond_decimal_mantissa() {
        // 1e29 base units does not fit a 96-bit mantissa
        let amount = 100_000_000_000 * WAD;
        assert_eq!(
            mul_amount(amount, dec!(0.0001), Rounding::Down).unwrap(),
            10_000_000 * WAD
        );
        assert_eq!(
            div_amount(amount, dec!(7.2), Rounding::Down).unwrap(),
            13_888_888_888_888_888_888_888_888_888
        );
        assert_eq!(
            div_amount(amount, dec!(7.2), Rounding::Up).unwrap(),
            13_888_888_888_888_888_888_888_888_889
        );
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        assert_eq!(
            mul_div(u128::MAX, u128::MAX, u128::MAX, Rounding::Down).unwrap(),
            u128::MAX
        );
        assert_eq!(mul_div(u128::MAX, 2, 4, Rounding::Down).unwrap(), u128::MAX / 2);
        assert_eq!(
            mul_div(u128::MAX, 2, 4, Rounding::Up).unwrap(),
            u128::MAX / 2 + 1
        );
        assert_eq!(
            mul_div(u128::MAX, 2, 1, Rounding::Down).unwrap_err(),
            MathError::Overflow("mul_div")
        );
    }

    #[test]
    fn test_ratio_wad_conversion() {
        assert_eq!(ratio_to_wad(dec!(1.5), Rounding::Down).unwrap(), 3 * WAD / 2);
        // Past 18 places the direction matters
        let tiny = Decimal::new(15, 19);
        assert_eq!(ratio_to_wad(tiny, Rounding::Down).unwrap(), 1);
        assert_eq!(ratio_to_wad(tiny, Rounding::Up).unwrap(), 2);
        assert!(ratio_to_wad(dec!(-1), Rounding::Down).is_err());

        assert_eq!(wad_to_ratio(3 * WAD / 2).unwrap(), dec!(1.5));
        // A trillion-fold ratio keeps its integer part
        let wide = wad_to_ratio(1_000_000_000_000 * WAD).unwrap();
        assert_eq!(wide, dec!(1_000_000_000_000));
        assert_eq!(ratio_of(3, 2, Rounding::Down).unwrap(), dec!(1.5));
    }

    #[test]
    fn test_to_amount_rejects_negative() {
        assert_eq!(
            to_amount(dec!(-1), Rounding::Down).unwrap_err(),
            MathError::Negative("to_amount")
        );
    }

    proptest! {
        #[test]
        fn prop_round_up_never_below_round_down(amount in 0u128..1_000_000_000_000_000_000_000u128, bps in 0u32..100_000u32) {
            let factor = Decimal::new(i64::from(bps), 4);
            let down = mul_amount(amount, factor, Rounding::Down).unwrap();
            let up = mul_amount(amount, factor, Rounding::Up).unwrap();
            prop_assert!(up >= down);
            prop_assert!(up - down <= 1);
        }

        #[test]
        fn prop_mul_div_matches_narrow_arithmetic(a in any::<u64>(), b in any::<u64>(), c in 1u64..=u64::MAX) {
            let (a, b, c) = (u128::from(a), u128::from(b), u128::from(c));
            prop_assert_eq!(mul_div(a, b, c, Rounding::Down).unwrap(), a * b / c);
            let up = mul_div(a, b, c, Rounding::Up).unwrap();
            prop_assert_eq!(up, (a * b + c - 1) / c);
        }
    }
}
