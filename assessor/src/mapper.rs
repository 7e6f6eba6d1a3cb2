//! Score to bound mapping

use crate::error::{AssessorError, Result};
use credit_primitives::math::{round_ratio, to_decimal};
use credit_primitives::{MathError, Rounding};
use rust_decimal::Decimal;
use std::fmt;

/// Maps a score onto `[lower, upper]`
///
/// Implementations must return `upper` for a zero score and `lower` for a
/// maximal score. The assessor rejects anything outside the bounds.
pub trait Mapper: fmt::Debug + Send + Sync {
    /// Map `score` out of `max_score`
    fn map(&self, score: u128, max_score: u128, lower: Decimal, upper: Decimal) -> Result<Decimal>;
}

/// Linear interpolation from `upper` (score 0) down to `lower` (max score)
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearMapper;

impl Mapper for LinearMapper {
    fn map(&self, score: u128, max_score: u128, lower: Decimal, upper: Decimal) -> Result<Decimal> {
        if max_score == 0 {
            return Err(AssessorError::InvalidMaxScore);
        }
        if score > max_score {
            return Err(AssessorError::ScoreExceedsMax { score, max_score });
        }

        let span = upper - lower;
        let reduction = to_decimal(score)?
            .checked_mul(span)
            .ok_or(MathError::Overflow("linear map"))?
            .checked_div(to_decimal(max_score)?)
            .ok_or(MathError::Overflow("linear map"))?;

        // Rounding the reduction down keeps the bound on the conservative side
        Ok(upper - round_ratio(reduction, Rounding::Down))
    }
}
