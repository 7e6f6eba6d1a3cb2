//! Vault ledger
//!
//! One ledger per collateral asset. Users deposit collateral and borrow
//! credits against it, paid out in a pool stablecoin. Each mutating call
//! runs every check first, then settles token transfers through the bank,
//! then commits pool and ledger state; a failure at any step leaves all
//! three untouched.

use crate::error::{Error, Result};
use crate::events::LedgerEvent;
use crate::interest::BorrowIndex;
use crate::oracle::Oracle;
use crate::types::{LedgerParams, Vault, VaultView};
use assessor::Assessor;
use credit_primitives::math::{
    div_amount, from_wad, mul_amount, precision_scalar, ratio_of, round_ratio, to_wad,
};
use credit_primitives::{
    Address, Authorization, CallContext, MathError, ProtocolTag, Role, Rounding, ScoreProof,
    TokenBank, Transfer,
};
use liquidity_pool::{InterestPlan, LiquidityPool, PoolError, SwapDirection, SwapPlan};
use rust_decimal::Decimal;
use score_registry::ScoreRegistry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Epochs a fresh account waits before its credit proofs count
const PROOF_EPOCH_LAG: u64 = 2;

/// Components a ledger operation reads or settles against
#[derive(Debug)]
pub struct Collaborators<'a> {
    /// Score roots
    pub registry: &'a ScoreRegistry,

    /// Score to c-ratio mapping
    pub assessor: &'a Assessor,

    /// Stablecoin liquidity
    pub pool: &'a mut LiquidityPool,

    /// Token balances
    pub bank: &'a mut dyn TokenBank,

    /// Collateral price
    pub oracle: &'a dyn Oracle,
}

/// Everything a successful operation commits
#[derive(Debug)]
struct Pending {
    account: Address,
    vault: Vault,
    index: BorrowIndex,
    total_normalized: u128,
    transfers: Vec<Transfer>,
    swap: Option<SwapPlan>,
    interest: Option<InterestPlan>,
    effective_epoch: Option<u64>,
    proof_verified: bool,
}

/// Interest-first split of a debt payment
#[derive(Debug)]
struct Repayment {
    vault: Vault,
    interest_paid: u128,
    principal_paid: u128,
    stables_in: u128,
    transfers: Vec<Transfer>,
    swap: Option<SwapPlan>,
    interest: Option<InterestPlan>,
}

/// Collateralized debt positions for one collateral asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLedger {
    id: Address,
    params: LedgerParams,
    collateral_decimals: u8,
    collateral_scalar: u128,
    vaults: BTreeMap<Address, Vault>,
    index: BorrowIndex,
    total_normalized: u128,
    effective_epochs: BTreeMap<Address, u64>,
    proof_holders: BTreeSet<Address>,
    paused: bool,
    auth: Authorization,
}

impl VaultLedger {
    /// Create a ledger
    ///
    /// `id` is both the account holding deposited collateral and the core
    /// identity the pool meters swaps against.
    pub fn new(
        id: Address,
        owner: Address,
        params: LedgerParams,
        bank: &dyn TokenBank,
        now: u64,
    ) -> Result<Self> {
        params.validate().map_err(Error::InvalidParams)?;
        let collateral_decimals = bank.decimals(&params.collateral_asset)?;
        let collateral_scalar = precision_scalar(collateral_decimals)?;

        info!(
            ledger = %id,
            collateral = %params.collateral_asset,
            decimals = collateral_decimals,
            "Vault ledger created"
        );

        Ok(Self {
            id,
            params,
            collateral_decimals,
            collateral_scalar,
            vaults: BTreeMap::new(),
            index: BorrowIndex::new(now),
            total_normalized: 0,
            effective_epochs: BTreeMap::new(),
            proof_holders: BTreeSet::new(),
            paused: false,
            auth: Authorization::with_owner(owner),
        })
    }

    /// Add collateral to the caller's vault
    ///
    /// A verified credit proof makes the account's proofs count from the
    /// current registry epoch; without one, a first deposit starts the
    /// account two epochs out.
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        collab: &mut Collaborators<'_>,
        amount: u128,
        proof: Option<&ScoreProof>,
    ) -> Result<LedgerEvent> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        self.current_price(collab.oracle, ctx.now)?;
        let index = self.index.accrued(self.params.interest_rate, ctx.now)?;

        let account = ctx.caller;
        let proof = self.screen_credit_proof(&account, proof)?;
        let verified = proof.map(|p| collab.registry.verify(p)).unwrap_or(false);
        let epoch = collab.registry.current_epoch();
        let effective_epoch = if verified {
            Some(epoch)
        } else if !self.effective_epochs.contains_key(&account) {
            Some(epoch.saturating_add(PROOF_EPOCH_LAG))
        } else {
            None
        };

        let mut vault = self.vault(&account);
        vault.collateral_amount = vault
            .collateral_amount
            .checked_add(amount)
            .ok_or(MathError::Overflow("deposit"))?;
        let debt = index.denormalize(vault.normalized_borrowed)?;

        let event = LedgerEvent::Deposited {
            account,
            amount,
            collateral_amount: vault.collateral_amount,
            debt,
        };
        self.apply(
            collab,
            Pending {
                account,
                vault,
                index,
                total_normalized: self.total_normalized,
                transfers: vec![Transfer::new(
                    self.params.collateral_asset,
                    account,
                    self.id,
                    amount,
                )],
                swap: None,
                interest: None,
                effective_epoch,
                proof_verified: verified,
            },
        )?;
        info!(ledger = %self.id, %account, amount, "Collateral deposited");
        Ok(event)
    }

    /// Borrow `amount` credits, paid out in `asset`
    ///
    /// The limit proof caps total debt before the borrow fee; the credit
    /// proof lowers the c-ratio the vault must hold after it.
    pub fn borrow(
        &mut self,
        ctx: &CallContext,
        collab: &mut Collaborators<'_>,
        amount: u128,
        asset: Address,
        credit_proof: Option<&ScoreProof>,
        limit_proof: Option<&ScoreProof>,
    ) -> Result<LedgerEvent> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let price = self.current_price(collab.oracle, ctx.now)?;
        let index = self.index.accrued(self.params.interest_rate, ctx.now)?;

        let account = ctx.caller;
        let mut vault = self.vault(&account);
        let debt = index.denormalize(vault.normalized_borrowed)?;

        let limit = self.borrow_limit(&account, limit_proof, collab.registry)?;
        let requested = debt
            .checked_add(amount)
            .ok_or(MathError::Overflow("borrow"))?;
        if requested > limit {
            return Err(Error::BorrowLimitExceeded {
                debt: requested,
                limit,
            });
        }

        let fee = mul_amount(amount, self.params.borrow_fee, Rounding::Up)?;
        let added = amount.checked_add(fee).ok_or(MathError::Overflow("borrow"))?;
        let old_normalized = vault.normalized_borrowed;
        vault.normalized_borrowed = old_normalized
            .checked_add(index.normalize(added, Rounding::Up)?)
            .ok_or(MathError::Overflow("borrow"))?;
        vault.principal = vault
            .principal
            .checked_add(amount)
            .ok_or(MathError::Overflow("borrow"))?;
        let new_debt = index.denormalize(vault.normalized_borrowed)?;

        let credit = self.usable_credit_proof(&account, credit_proof, collab.registry)?;
        let score_required =
            self.params.borrow_score_required || self.proof_holders.contains(&account);
        let ratio = self.assessed_ratio(collab, credit, score_required)?;
        self.ensure_collateralized(vault.collateral_amount, new_debt, price, ratio)?;

        let total_normalized = self
            .total_normalized
            .checked_add(vault.normalized_borrowed - old_normalized)
            .ok_or(MathError::Overflow("borrow"))?;
        let total = index.denormalize(total_normalized)?;
        if total > self.params.total_borrow_limit {
            return Err(Error::TotalBorrowLimitExceeded {
                total,
                limit: self.params.total_borrow_limit,
            });
        }
        self.ensure_vault_bounds(new_debt)?;

        let plan = collab
            .pool
            .plan_swap(self.id, SwapDirection::CreditsForStables, asset, amount)?;
        let stables_out = plan.stable_amount();
        let payout = Transfer::new(asset, collab.pool.account(), account, stables_out);
        let verified = credit.map(|p| collab.registry.verify(p)).unwrap_or(false);

        let event = LedgerEvent::Borrowed {
            account,
            asset,
            amount,
            fee,
            stables_out,
            collateral_amount: vault.collateral_amount,
            principal: vault.principal,
            debt: new_debt,
        };
        self.apply(
            collab,
            Pending {
                account,
                vault,
                index,
                total_normalized,
                transfers: vec![payout],
                swap: Some(plan),
                interest: None,
                effective_epoch: None,
                proof_verified: verified,
            },
        )?;
        info!(
            ledger = %self.id,
            %account,
            %asset,
            amount,
            fee,
            debt = new_debt,
            "Credits borrowed"
        );
        Ok(event)
    }

    /// Repay up to the outstanding debt in `asset`
    ///
    /// Interest is settled first, split between pool LPs and the fee
    /// collector; the remainder swaps back into the pool as principal. A
    /// proof is accepted but never required.
    pub fn repay(
        &mut self,
        ctx: &CallContext,
        collab: &mut Collaborators<'_>,
        amount: u128,
        asset: Address,
        proof: Option<&ScoreProof>,
    ) -> Result<LedgerEvent> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        self.current_price(collab.oracle, ctx.now)?;
        let index = self.index.accrued(self.params.interest_rate, ctx.now)?;

        let account = ctx.caller;
        self.screen_credit_proof(&account, proof)?;
        let vault = self.vault(&account);
        let debt = index.denormalize(vault.normalized_borrowed)?;
        if debt == 0 {
            return Err(Error::NothingToRepay);
        }
        if amount > debt {
            return Err(Error::RepayExceedsDebt { debt, amount });
        }

        let repayment =
            self.plan_repayment(collab.pool, &index, vault, debt, amount, asset, account)?;
        let remaining = index.denormalize(repayment.vault.normalized_borrowed)?;
        let total_normalized = self.rebased_total(vault, &repayment.vault);

        let event = LedgerEvent::Repaid {
            account,
            asset,
            amount,
            interest_paid: repayment.interest_paid,
            principal_paid: repayment.principal_paid,
            stables_in: repayment.stables_in,
            principal: repayment.vault.principal,
            debt: remaining,
        };
        self.apply(
            collab,
            Pending {
                account,
                vault: repayment.vault,
                index,
                total_normalized,
                transfers: repayment.transfers,
                swap: repayment.swap,
                interest: repayment.interest,
                effective_epoch: None,
                proof_verified: false,
            },
        )?;
        info!(
            ledger = %self.id,
            %account,
            %asset,
            amount,
            interest_paid = repayment.interest_paid,
            debt = remaining,
            "Debt repaid"
        );
        Ok(event)
    }

    /// Withdraw collateral, keeping any debt collateralized
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        collab: &mut Collaborators<'_>,
        amount: u128,
        proof: Option<&ScoreProof>,
    ) -> Result<LedgerEvent> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let price = self.current_price(collab.oracle, ctx.now)?;
        let index = self.index.accrued(self.params.interest_rate, ctx.now)?;

        let account = ctx.caller;
        let mut vault = self.vault(&account);
        if amount > vault.collateral_amount {
            return Err(Error::InsufficientCollateral {
                available: vault.collateral_amount,
                requested: amount,
            });
        }
        vault.collateral_amount -= amount;

        let debt = index.denormalize(vault.normalized_borrowed)?;
        let credit = self.usable_credit_proof(&account, proof, collab.registry)?;
        if debt > 0 {
            let ratio = self.assessed_ratio(collab, credit, false)?;
            self.ensure_collateralized(vault.collateral_amount, debt, price, ratio)?;
        }

        let event = LedgerEvent::Withdrawn {
            account,
            amount,
            collateral_amount: vault.collateral_amount,
            debt,
        };
        self.apply(
            collab,
            Pending {
                account,
                vault,
                index,
                total_normalized: self.total_normalized,
                transfers: vec![Transfer::new(
                    self.params.collateral_asset,
                    self.id,
                    account,
                    amount,
                )],
                swap: None,
                interest: None,
                effective_epoch: None,
                proof_verified: false,
            },
        )?;
        info!(ledger = %self.id, %account, amount, "Collateral withdrawn");
        Ok(event)
    }

    /// Liquidate an undercollateralized vault
    ///
    /// The caller repays as much debt as the collateral covers at the
    /// discounted price and receives that collateral, less the protocol's
    /// cut of the discount. Any debt the collateral cannot cover stays on
    /// the vault. A vault whose owner has proved a score can only be
    /// liquidated with a verified proof for that owner.
    pub fn liquidate(
        &mut self,
        ctx: &CallContext,
        collab: &mut Collaborators<'_>,
        account: Address,
        asset: Address,
        proof: Option<&ScoreProof>,
    ) -> Result<LedgerEvent> {
        self.ensure_active()?;
        let price = self.current_price(collab.oracle, ctx.now)?;
        let index = self.index.accrued(self.params.interest_rate, ctx.now)?;

        let vault = self.vault(&account);
        let debt = index.denormalize(vault.normalized_borrowed)?;
        if debt == 0 {
            return Err(Error::NotLiquidatable);
        }

        // Accounts that have proved a score are judged against their
        // credit-adjusted bound, so the liquidator must supply the proof
        let credit = self.usable_credit_proof(&account, proof, collab.registry)?;
        let score_required = self.proof_holders.contains(&account);
        let ratio = self.assessed_ratio(collab, credit, score_required)?;
        let value = self.collateral_value(vault.collateral_amount, price)?;
        let required = mul_amount(debt, ratio, Rounding::Up)?;
        if value >= required {
            return Err(Error::NotLiquidatable);
        }

        let discounted_price = round_ratio(
            price
                .checked_mul(Decimal::ONE - self.params.liquidator_discount)
                .ok_or(MathError::Overflow("liquidate"))?,
            Rounding::Down,
        );
        if discounted_price.is_zero() {
            return Err(Error::ZeroPrice);
        }
        let repay = debt.min(self.collateral_value(vault.collateral_amount, discounted_price)?);
        if repay == 0 {
            return Err(Error::NotLiquidatable);
        }

        let liquidator = ctx.caller;
        let mut repayment =
            self.plan_repayment(collab.pool, &index, vault, debt, repay, asset, liquidator)?;

        let seized = from_wad(
            div_amount(repay, discounted_price, Rounding::Down)?,
            self.collateral_scalar,
            Rounding::Down,
        )?
        .min(vault.collateral_amount);
        let market_equivalent = from_wad(
            div_amount(repay, price, Rounding::Up)?,
            self.collateral_scalar,
            Rounding::Up,
        )?
        .min(seized);
        let arc_fee = mul_amount(
            seized - market_equivalent,
            self.params.liquidation_arc_fee,
            Rounding::Up,
        )?;

        repayment.vault.collateral_amount = vault.collateral_amount - seized;
        let collateral = self.params.collateral_asset;
        repayment
            .transfers
            .push(Transfer::new(collateral, self.id, liquidator, seized - arc_fee));
        repayment.transfers.push(Transfer::new(
            collateral,
            self.id,
            self.params.fee_collector,
            arc_fee,
        ));

        let remaining = index.denormalize(repayment.vault.normalized_borrowed)?;
        let total_normalized = self.rebased_total(vault, &repayment.vault);

        let event = LedgerEvent::Liquidated {
            account,
            liquidator,
            asset,
            repaid: repay,
            collateral_seized: seized,
            arc_fee,
            collateral_amount: repayment.vault.collateral_amount,
            debt: remaining,
        };
        self.apply(
            collab,
            Pending {
                account,
                vault: repayment.vault,
                index,
                total_normalized,
                transfers: repayment.transfers,
                swap: repayment.swap,
                interest: repayment.interest,
                effective_epoch: None,
                proof_verified: false,
            },
        )?;
        warn!(
            ledger = %self.id,
            %account,
            %liquidator,
            repaid = repay,
            seized,
            arc_fee,
            debt = remaining,
            "Vault liquidated"
        );
        Ok(event)
    }

    /// Pause or unpause (pause operator only)
    pub fn set_paused(&mut self, ctx: &CallContext, paused: bool) -> Result<()> {
        self.auth.require(Role::PauseOperator, &ctx.caller)?;
        self.paused = paused;
        info!(ledger = %self.id, paused, "Ledger pause state changed");
        Ok(())
    }

    /// Change the per-second interest rate (interest setter only)
    ///
    /// Interest up to `ctx.now` accrues at the old rate first.
    pub fn set_interest_rate(&mut self, ctx: &CallContext, rate: Decimal) -> Result<()> {
        self.auth.require(Role::InterestSetter, &ctx.caller)?;
        let mut params = self.params.clone();
        params.interest_rate = rate;
        params.validate().map_err(Error::InvalidParams)?;

        self.index = self.index.accrued(self.params.interest_rate, ctx.now)?;
        self.params = params;
        info!(ledger = %self.id, %rate, index = %self.index.value(), "Interest rate changed");
        Ok(())
    }

    /// Change the c-ratio bounds (owner only)
    pub fn set_collateral_ratios(
        &mut self,
        ctx: &CallContext,
        low_c_ratio: Decimal,
        high_c_ratio: Decimal,
    ) -> Result<()> {
        self.update_params(ctx, |p| {
            p.low_c_ratio = low_c_ratio;
            p.high_c_ratio = high_c_ratio;
        })
    }

    /// Change borrow and liquidation fees (owner only)
    pub fn set_fees(
        &mut self,
        ctx: &CallContext,
        borrow_fee: Decimal,
        pool_interest_share: Decimal,
        liquidator_discount: Decimal,
        liquidation_arc_fee: Decimal,
    ) -> Result<()> {
        self.update_params(ctx, |p| {
            p.borrow_fee = borrow_fee;
            p.pool_interest_share = pool_interest_share;
            p.liquidator_discount = liquidator_discount;
            p.liquidation_arc_fee = liquidation_arc_fee;
        })
    }

    /// Change debt limits (owner only)
    pub fn set_limits(
        &mut self,
        ctx: &CallContext,
        total_borrow_limit: u128,
        vault_borrow_minimum: u128,
        vault_borrow_maximum: u128,
        default_borrow_limit: Option<u128>,
    ) -> Result<()> {
        self.update_params(ctx, |p| {
            p.total_borrow_limit = total_borrow_limit;
            p.vault_borrow_minimum = vault_borrow_minimum;
            p.vault_borrow_maximum = vault_borrow_maximum;
            p.default_borrow_limit = default_borrow_limit;
        })
    }

    /// Change the oldest acceptable price age (owner only)
    pub fn set_max_price_staleness(&mut self, ctx: &CallContext, seconds: u64) -> Result<()> {
        self.update_params(ctx, |p| p.max_price_staleness = seconds)
    }

    /// Change the fee collector (owner only)
    pub fn set_fee_collector(&mut self, ctx: &CallContext, fee_collector: Address) -> Result<()> {
        self.update_params(ctx, |p| p.fee_collector = fee_collector)
    }

    /// Change the proof protocol tags (owner only)
    pub fn set_proof_protocols(
        &mut self,
        ctx: &CallContext,
        credit_protocol: ProtocolTag,
        limit_protocol: ProtocolTag,
    ) -> Result<()> {
        self.update_params(ctx, |p| {
            p.credit_protocol = credit_protocol;
            p.limit_protocol = limit_protocol;
        })
    }

    /// Require a credit proof on every borrow (owner only)
    pub fn set_borrow_score_required(&mut self, ctx: &CallContext, required: bool) -> Result<()> {
        self.update_params(ctx, |p| p.borrow_score_required = required)
    }

    /// Grant a role (owner only)
    pub fn grant_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> Result<()> {
        Ok(self.auth.grant(&ctx.caller, role, account)?)
    }

    /// Revoke a role (owner only)
    pub fn revoke_role(&mut self, ctx: &CallContext, role: Role, account: &Address) -> Result<()> {
        Ok(self.auth.revoke(&ctx.caller, role, account)?)
    }

    /// Ledger ID
    pub fn id(&self) -> Address {
        self.id
    }

    /// Current parameters
    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Collateral token decimals
    pub fn collateral_decimals(&self) -> u8 {
        self.collateral_decimals
    }

    /// Stored vault (zeroed if the account never deposited)
    pub fn vault(&self, account: &Address) -> Vault {
        self.vaults.get(account).copied().unwrap_or_default()
    }

    /// Accounts with a vault
    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.vaults.keys()
    }

    /// Vault and its debt as of `now`
    pub fn view(&self, account: &Address, now: u64) -> Result<VaultView> {
        let vault = self.vault(account);
        let debt = self.index_at(now)?.denormalize(vault.normalized_borrowed)?;
        Ok(VaultView { vault, debt })
    }

    /// Debt as of `now`
    pub fn current_debt(&self, account: &Address, now: u64) -> Result<u128> {
        Ok(self.view(account, now)?.debt)
    }

    /// Collateral value over debt at the oracle price, `None` without debt
    pub fn collateral_ratio(
        &self,
        account: &Address,
        oracle: &dyn Oracle,
        now: u64,
    ) -> Result<Option<Decimal>> {
        let view = self.view(account, now)?;
        if view.debt == 0 {
            return Ok(None);
        }
        let price = oracle.fetch_current_price().value;
        let value = self.collateral_value(view.vault.collateral_amount, price)?;
        Ok(Some(ratio_of(value, view.debt, Rounding::Down)?))
    }

    /// Borrow index as last committed
    pub fn borrow_index(&self) -> BorrowIndex {
        self.index
    }

    /// Ledger debt as of `now`
    pub fn total_debt(&self, now: u64) -> Result<u128> {
        Ok(self.index_at(now)?.denormalize(self.total_normalized)?)
    }

    /// Sum of normalized vault debt
    pub fn total_normalized(&self) -> u128 {
        self.total_normalized
    }

    /// First registry epoch whose proofs count for `account`
    pub fn effective_epoch(&self, account: &Address) -> Option<u64> {
        self.effective_epochs.get(account).copied()
    }

    /// Pause flag
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Role table
    pub fn authorization(&self) -> &Authorization {
        &self.auth
    }

    fn index_at(&self, now: u64) -> Result<BorrowIndex> {
        Ok(self.index.accrued(self.params.interest_rate, now)?)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.paused {
            return Err(Error::Paused);
        }
        Ok(())
    }

    /// Oracle price, rejected when zero or older than the staleness window
    fn current_price(&self, oracle: &dyn Oracle, now: u64) -> Result<Decimal> {
        let reading = oracle.fetch_current_price();
        if reading.value <= Decimal::ZERO {
            return Err(Error::ZeroPrice);
        }
        if now.saturating_sub(reading.timestamp) > self.params.max_price_staleness {
            return Err(Error::StalePrice {
                observed: reading.timestamp,
                now,
                max_staleness: self.params.max_price_staleness,
            });
        }
        Ok(reading.value)
    }

    /// Collateral value in credits, rounded down
    fn collateral_value(&self, collateral: u128, price: Decimal) -> Result<u128> {
        Ok(mul_amount(
            to_wad(collateral, self.collateral_scalar)?,
            price,
            Rounding::Down,
        )?)
    }

    fn ensure_collateralized(
        &self,
        collateral: u128,
        debt: u128,
        price: Decimal,
        ratio: Decimal,
    ) -> Result<()> {
        if debt == 0 {
            return Ok(());
        }
        let collateral_value = self.collateral_value(collateral, price)?;
        let required = mul_amount(debt, ratio, Rounding::Up)?;
        if collateral_value < required {
            return Err(Error::Undercollateralized {
                collateral_value,
                required,
            });
        }
        Ok(())
    }

    fn ensure_vault_bounds(&self, debt: u128) -> Result<()> {
        if debt < self.params.vault_borrow_minimum {
            return Err(Error::BelowVaultMinimum {
                debt,
                minimum: self.params.vault_borrow_minimum,
            });
        }
        if debt > self.params.vault_borrow_maximum {
            return Err(Error::AboveVaultMaximum {
                debt,
                maximum: self.params.vault_borrow_maximum,
            });
        }
        Ok(())
    }

    fn assessed_ratio(
        &self,
        collab: &Collaborators<'_>,
        proof: Option<&ScoreProof>,
        score_required: bool,
    ) -> Result<Decimal> {
        Ok(collab.assessor.assess(
            collab.registry,
            self.params.low_c_ratio,
            self.params.high_c_ratio,
            proof,
            score_required,
        )?)
    }

    /// Reject a credit proof naming another account or protocol
    ///
    /// An empty proof is the same as none.
    fn screen_credit_proof<'p>(
        &self,
        account: &Address,
        proof: Option<&'p ScoreProof>,
    ) -> Result<Option<&'p ScoreProof>> {
        let proof = match proof {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(None),
        };
        if proof.account != *account {
            return Err(Error::ProofAccountMismatch {
                expected: *account,
                actual: proof.account,
            });
        }
        if proof.protocol != self.params.credit_protocol {
            return Err(Error::WrongProtocol {
                expected: self.params.credit_protocol,
                actual: proof.protocol,
            });
        }
        Ok(Some(proof))
    }

    /// Screened credit proof, dropped while the account's epoch is ahead
    fn usable_credit_proof<'p>(
        &self,
        account: &Address,
        proof: Option<&'p ScoreProof>,
        registry: &ScoreRegistry,
    ) -> Result<Option<&'p ScoreProof>> {
        let proof = self.screen_credit_proof(account, proof)?;
        match self.effective_epochs.get(account) {
            Some(&effective) if registry.current_epoch() < effective => {
                debug!(%account, effective, "Credit proof not yet effective");
                Ok(None)
            }
            _ => Ok(proof),
        }
    }

    /// Borrow limit from a verified limit proof, else the default
    fn borrow_limit(
        &self,
        account: &Address,
        proof: Option<&ScoreProof>,
        registry: &ScoreRegistry,
    ) -> Result<u128> {
        if let Some(proof) = proof {
            if !proof.account.is_zero() && proof.account != *account {
                return Err(Error::ProofAccountMismatch {
                    expected: *account,
                    actual: proof.account,
                });
            }
            if proof.protocol != self.params.limit_protocol {
                return Err(Error::WrongProtocol {
                    expected: self.params.limit_protocol,
                    actual: proof.protocol,
                });
            }
            if registry.verify(proof) {
                return Ok(proof.score);
            }
        }
        self.params.default_borrow_limit.ok_or(Error::InvalidProof)
    }

    /// Split `amount` of `debt` into interest and principal payments by `payer`
    #[allow(clippy::too_many_arguments)]
    fn plan_repayment(
        &self,
        pool: &LiquidityPool,
        index: &BorrowIndex,
        vault: Vault,
        debt: u128,
        amount: u128,
        asset: Address,
        payer: Address,
    ) -> Result<Repayment> {
        let scalar = pool
            .asset_state(&asset)
            .map(|state| state.scalar)
            .ok_or(PoolError::UnsupportedAsset(asset))?;

        let interest_owed = debt.saturating_sub(vault.principal);
        let interest_paid = amount.min(interest_owed);
        let principal_paid = amount - interest_paid;
        let pool_share = mul_amount(
            interest_paid,
            self.params.pool_interest_share,
            Rounding::Down,
        )?;
        let fee_share = interest_paid - pool_share;

        let mut transfers = Vec::new();
        let mut stables_in = 0u128;
        let mut interest = None;
        let mut swap = None;

        if pool_share > 0 {
            let stables = from_wad(pool_share, scalar, Rounding::Up)?;
            interest = Some(pool.plan_interest(asset, stables)?);
            transfers.push(Transfer::new(asset, payer, pool.account(), stables));
            stables_in += stables;
        }
        if fee_share > 0 {
            let stables = from_wad(fee_share, scalar, Rounding::Up)?;
            transfers.push(Transfer::new(asset, payer, self.params.fee_collector, stables));
            stables_in += stables;
        }
        if principal_paid > 0 {
            let plan = pool.plan_swap(
                self.id,
                SwapDirection::StablesForCredits,
                asset,
                principal_paid,
            )?;
            transfers.push(Transfer::new(
                asset,
                payer,
                pool.account(),
                plan.stable_amount(),
            ));
            stables_in += plan.stable_amount();
            swap = Some(plan);
        }

        let remaining = debt - amount;
        let mut updated = vault;
        if remaining == 0 {
            updated.normalized_borrowed = 0;
            updated.principal = 0;
        } else {
            updated.normalized_borrowed = index.normalize(remaining, Rounding::Up)?;
            updated.principal = vault.principal.saturating_sub(principal_paid);
        }

        Ok(Repayment {
            vault: updated,
            interest_paid,
            principal_paid,
            stables_in,
            transfers,
            swap,
            interest,
        })
    }

    fn rebased_total(&self, before: Vault, after: &Vault) -> u128 {
        self.total_normalized
            .saturating_sub(before.normalized_borrowed)
            .saturating_add(after.normalized_borrowed)
    }

    fn update_params(
        &mut self,
        ctx: &CallContext,
        change: impl FnOnce(&mut LedgerParams),
    ) -> Result<()> {
        self.auth.require(Role::Owner, &ctx.caller)?;
        let mut params = self.params.clone();
        change(&mut params);
        params.validate().map_err(Error::InvalidParams)?;
        self.params = params;
        info!(ledger = %self.id, "Ledger parameters updated");
        Ok(())
    }

    /// Settle transfers, then commit pool and ledger state
    fn apply(&mut self, collab: &mut Collaborators<'_>, pending: Pending) -> Result<()> {
        collab.bank.settle(&pending.transfers)?;
        if let Some(plan) = pending.swap {
            collab.pool.commit_swap(plan);
        }
        if let Some(plan) = pending.interest {
            collab.pool.commit_interest(plan);
        }

        self.index = pending.index;
        self.total_normalized = pending.total_normalized;
        self.vaults.insert(pending.account, pending.vault);
        if let Some(epoch) = pending.effective_epoch {
            self.effective_epochs.insert(pending.account, epoch);
        }
        if pending.proof_verified {
            self.proof_holders.insert(pending.account);
        }
        Ok(())
    }
}
