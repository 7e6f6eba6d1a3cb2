//! Credit score assessment

use crate::error::{AssessorError, Result};
use crate::mapper::{LinearMapper, Mapper};
use credit_primitives::{Address, Authorization, CallContext, Role, ScoreProof};
use rust_decimal::Decimal;
use score_registry::ScoreRegistry;
use tracing::{debug, info};

/// Turns a proven credit score into a collateralization bound
#[derive(Debug)]
pub struct Assessor {
    mapper: Box<dyn Mapper>,
    max_score: u128,
    auth: Authorization,
}

impl Assessor {
    /// Create an assessor with the linear mapper
    pub fn new(owner: Address, max_score: u128) -> Result<Self> {
        if max_score == 0 {
            return Err(AssessorError::InvalidMaxScore);
        }
        Ok(Self {
            mapper: Box::new(LinearMapper),
            max_score,
            auth: Authorization::with_owner(owner),
        })
    }

    /// Replace the mapper at construction
    pub fn with_mapper(mut self, mapper: Box<dyn Mapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Assess a bound for the proof's account
    ///
    /// Returns `upper` when no verifiable proof is given and a score is not
    /// required; otherwise maps the proven score into `[lower, upper]`.
    pub fn assess(
        &self,
        registry: &ScoreRegistry,
        lower: Decimal,
        upper: Decimal,
        proof: Option<&ScoreProof>,
        score_required: bool,
    ) -> Result<Decimal> {
        if upper.is_zero() || upper <= lower || lower.is_sign_negative() {
            return Err(AssessorError::InvalidBounds { lower, upper });
        }

        let record = proof
            .filter(|p| !p.is_empty())
            .and_then(|p| registry.verify_score(p).ok());

        let record = match record {
            Some(record) => record,
            None if score_required => return Err(AssessorError::InvalidProof),
            None => {
                debug!(%upper, "No verified score, using upper bound");
                return Ok(upper);
            }
        };

        if record.score > self.max_score {
            return Err(AssessorError::ScoreExceedsMax {
                score: record.score,
                max_score: self.max_score,
            });
        }

        let value = self.mapper.map(record.score, self.max_score, lower, upper)?;
        if value < lower || value > upper {
            return Err(AssessorError::OutOfBounds {
                value,
                lower,
                upper,
            });
        }

        debug!(account = %record.account, score = record.score, %value, "Score assessed");
        Ok(value)
    }

    /// Change the max score (owner only)
    pub fn set_max_score(&mut self, ctx: &CallContext, max_score: u128) -> Result<()> {
        self.auth.require(Role::Owner, &ctx.caller)?;
        if max_score == 0 {
            return Err(AssessorError::InvalidMaxScore);
        }
        self.max_score = max_score;
        info!(max_score, "Max score changed");
        Ok(())
    }

    /// Replace the mapper (owner only)
    pub fn set_mapper(&mut self, ctx: &CallContext, mapper: Box<dyn Mapper>) -> Result<()> {
        self.auth.require(Role::Owner, &ctx.caller)?;
        info!(?mapper, "Mapper replaced");
        self.mapper = mapper;
        Ok(())
    }

    /// Configured max score
    pub fn max_score(&self) -> u128 {
        self.max_score
    }
}
