//! Multi-asset stablecoin pool
//!
//! LPs deposit supported stablecoins for shares. Ledgers ("cores") draw
//! stables against their abstract credit unit when users borrow and return
//! them on repayment, each capped by a per-core swap limit.
//!
//! Units: asset limits and reserves are native token units; core swap
//! limits, the credit balance, pool value and shares are 18-decimal.

use crate::error::{PoolError, Result};
use crate::types::{
    AssetState, InterestPlan, SwapDirection, SwapPlan, Utilization, WithdrawTarget,
};
use credit_primitives::math::{from_wad, mul_div, precision_scalar, to_wad};
use credit_primitives::{
    Address, Authorization, CallContext, MathError, Role, Rounding, TokenBank, Transfer,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Liquidity pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityPool {
    account: Address,
    assets: BTreeMap<Address, AssetState>,
    supported: Vec<Address>,
    cores: BTreeMap<Address, Utilization>,
    credit_balance: u128,
    shares: BTreeMap<Address, u128>,
    total_shares: u128,
    auth: Authorization,
}

impl LiquidityPool {
    /// Create an empty pool holding its tokens under `account`
    pub fn new(owner: Address, account: Address) -> Self {
        Self {
            account,
            assets: BTreeMap::new(),
            supported: Vec::new(),
            cores: BTreeMap::new(),
            credit_balance: 0,
            shares: BTreeMap::new(),
            total_shares: 0,
            auth: Authorization::with_owner(owner),
        }
    }

    /// Set an asset's deposit limit (owner only)
    ///
    /// Zero removes the asset from the supported list, which is only allowed
    /// once nothing is counted against it. A non-zero limit on a new asset
    /// registers it, caching its precision scalar.
    pub fn set_deposit_limit(
        &mut self,
        ctx: &CallContext,
        bank: &dyn TokenBank,
        asset: Address,
        limit: u128,
    ) -> Result<()> {
        self.auth.require(Role::Owner, &ctx.caller)?;

        if limit == 0 {
            let state = self
                .assets
                .get_mut(&asset)
                .ok_or(PoolError::UnsupportedAsset(asset))?;
            if state.utilization.amount_used > 0 {
                return Err(PoolError::AssetInUse {
                    asset,
                    amount_used: state.utilization.amount_used,
                });
            }
            state.utilization.limit = 0;
            self.supported.retain(|a| a != &asset);
            info!(%asset, "Asset removed from pool");
            return Ok(());
        }

        match self.assets.get_mut(&asset) {
            Some(state) => {
                if limit < state.utilization.amount_used {
                    return Err(PoolError::LimitBelowUtilization {
                        used: state.utilization.amount_used,
                        limit,
                    });
                }
                state.utilization.limit = limit;
            }
            None => {
                let decimals = bank.decimals(&asset)?;
                let scalar = precision_scalar(decimals)?;
                self.assets.insert(
                    asset,
                    AssetState {
                        utilization: Utilization::with_limit(limit),
                        reserve: 0,
                        decimals,
                        scalar,
                    },
                );
            }
        }

        if !self.supported.contains(&asset) {
            self.supported.push(asset);
        }
        info!(%asset, limit, "Deposit limit set");
        Ok(())
    }

    /// Set a ledger's swap limit (owner only)
    pub fn set_core_swap_limit(&mut self, ctx: &CallContext, core: Address, limit: u128) -> Result<()> {
        self.auth.require(Role::Owner, &ctx.caller)?;

        let utilization = self.cores.entry(core).or_default();
        if limit < utilization.amount_used {
            return Err(PoolError::LimitBelowUtilization {
                used: utilization.amount_used,
                limit,
            });
        }
        utilization.limit = limit;
        info!(%core, limit, "Core swap limit set");
        Ok(())
    }

    /// Deposit stables, returning the shares minted
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        bank: &mut dyn TokenBank,
        asset: Address,
        amount: u128,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }

        let state = self.supported_state(&asset)?;
        let used = state.utilization.amount_used;
        let new_used = used
            .checked_add(amount)
            .ok_or(MathError::Overflow("pool deposit"))?;
        if new_used > state.utilization.limit {
            return Err(PoolError::DepositLimitExceeded {
                asset,
                used,
                amount,
                limit: state.utilization.limit,
            });
        }
        let new_reserve = state
            .reserve
            .checked_add(amount)
            .ok_or(MathError::Overflow("pool deposit"))?;

        let normalized = to_wad(amount, state.scalar)?;
        let minted = if self.total_shares == 0 {
            normalized
        } else {
            mul_div(normalized, self.total_shares, self.pool_value()?, Rounding::Down)?
        };
        if minted == 0 {
            return Err(PoolError::ZeroAmount);
        }

        bank.settle(&[Transfer::new(asset, ctx.caller, self.account, amount)])?;

        if let Some(state) = self.assets.get_mut(&asset) {
            state.utilization.amount_used = new_used;
            state.reserve = new_reserve;
        }
        *self.shares.entry(ctx.caller).or_insert(0) += minted;
        self.total_shares += minted;

        info!(lp = %ctx.caller, %asset, amount, shares = minted, "Pool deposit");
        Ok(minted)
    }

    /// Burn shares for their value in stables
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        bank: &mut dyn TokenBank,
        shares: u128,
        target: WithdrawTarget,
    ) -> Result<Vec<(Address, u128)>> {
        if shares == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let held = self.shares_of(&ctx.caller);
        if held < shares {
            return Err(PoolError::InsufficientShares {
                available: held,
                required: shares,
            });
        }

        let value = mul_div(shares, self.pool_value()?, self.total_shares, Rounding::Down)?;
        let payouts = match target {
            WithdrawTarget::Asset(asset) => {
                let state = self
                    .assets
                    .get(&asset)
                    .ok_or(PoolError::UnsupportedAsset(asset))?;
                let out = from_wad(value, state.scalar, Rounding::Down)?;
                if out > state.reserve {
                    return Err(PoolError::InsufficientLiquidity {
                        asset,
                        available: state.reserve,
                        required: out,
                    });
                }
                vec![(asset, out)]
            }
            WithdrawTarget::Proportional => self.proportional_payouts(value)?,
        };

        let transfers: Vec<Transfer> = payouts
            .iter()
            .map(|(asset, out)| Transfer::new(*asset, self.account, ctx.caller, *out))
            .collect();
        bank.settle(&transfers)?;

        for (asset, out) in &payouts {
            if let Some(state) = self.assets.get_mut(asset) {
                state.reserve = state.reserve.saturating_sub(*out);
                state.utilization.amount_used = state.utilization.amount_used.saturating_sub(*out);
            }
        }
        if let Some(balance) = self.shares.get_mut(&ctx.caller) {
            *balance -= shares;
        }
        self.total_shares -= shares;

        info!(lp = %ctx.caller, shares, value, "Pool withdrawal");
        Ok(payouts)
    }

    fn proportional_payouts(&self, value: u128) -> Result<Vec<(Address, u128)>> {
        let mut total_reserves = 0u128;
        for state in self.assets.values() {
            total_reserves = total_reserves
                .checked_add(to_wad(state.reserve, state.scalar)?)
                .ok_or(MathError::Overflow("pool reserves"))?;
        }
        if value > total_reserves {
            return Err(PoolError::InsufficientReserves {
                available: total_reserves,
                required: value,
            });
        }

        let mut payouts = Vec::new();
        for (asset, state) in &self.assets {
            if state.reserve == 0 {
                continue;
            }
            let weight = to_wad(state.reserve, state.scalar)?;
            let portion = mul_div(value, weight, total_reserves, Rounding::Down)?;
            let out = from_wad(portion, state.scalar, Rounding::Down)?;
            if out > 0 {
                payouts.push((*asset, out));
            }
        }
        Ok(payouts)
    }

    /// Validate a ledger swap without touching state
    pub fn plan_swap(
        &self,
        core: Address,
        direction: SwapDirection,
        asset: Address,
        credit_amount: u128,
    ) -> Result<SwapPlan> {
        if credit_amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let core_util = self.cores.get(&core).ok_or(PoolError::UnknownCore(core))?;
        let state = self.supported_state(&asset)?;

        let stable_amount = match direction {
            SwapDirection::CreditsForStables => {
                let used = core_util.amount_used;
                let new_used = used
                    .checked_add(credit_amount)
                    .ok_or(MathError::Overflow("swap"))?;
                if new_used > core_util.limit {
                    return Err(PoolError::CoreSwapLimitExceeded {
                        core,
                        used,
                        amount: credit_amount,
                        limit: core_util.limit,
                    });
                }
                self.credit_balance
                    .checked_add(credit_amount)
                    .ok_or(MathError::Overflow("swap"))?;

                let out = from_wad(credit_amount, state.scalar, Rounding::Down)?;
                if out > state.reserve {
                    return Err(PoolError::InsufficientLiquidity {
                        asset,
                        available: state.reserve,
                        required: out,
                    });
                }
                out
            }
            SwapDirection::StablesForCredits => {
                let amount_in = from_wad(credit_amount, state.scalar, Rounding::Up)?;
                let used = state.utilization.amount_used;
                let new_used = used
                    .checked_add(amount_in)
                    .ok_or(MathError::Overflow("swap"))?;
                if new_used > state.utilization.limit {
                    return Err(PoolError::DepositLimitExceeded {
                        asset,
                        used,
                        amount: amount_in,
                        limit: state.utilization.limit,
                    });
                }
                state
                    .reserve
                    .checked_add(amount_in)
                    .ok_or(MathError::Overflow("swap"))?;
                amount_in
            }
        };

        debug!(%core, ?direction, %asset, credit_amount, stable_amount, "Swap planned");
        Ok(SwapPlan {
            core,
            direction,
            asset,
            credit_amount,
            stable_amount,
        })
    }

    /// Apply a planned swap
    pub fn commit_swap(&mut self, plan: SwapPlan) {
        let SwapPlan {
            core,
            direction,
            asset,
            credit_amount,
            stable_amount,
        } = plan;

        let core_util = self.cores.entry(core).or_default();
        match direction {
            SwapDirection::CreditsForStables => {
                core_util.amount_used = core_util.amount_used.saturating_add(credit_amount);
                self.credit_balance = self.credit_balance.saturating_add(credit_amount);
                if let Some(state) = self.assets.get_mut(&asset) {
                    state.reserve = state.reserve.saturating_sub(stable_amount);
                    state.utilization.amount_used =
                        state.utilization.amount_used.saturating_sub(stable_amount);
                }
            }
            SwapDirection::StablesForCredits => {
                core_util.amount_used = core_util.amount_used.saturating_sub(credit_amount);
                self.credit_balance = self.credit_balance.saturating_sub(credit_amount);
                if let Some(state) = self.assets.get_mut(&asset) {
                    state.reserve = state.reserve.saturating_add(stable_amount);
                    state.utilization.amount_used =
                        state.utilization.amount_used.saturating_add(stable_amount);
                }
            }
        }

        info!(%core, ?direction, %asset, credit_amount, stable_amount, "Swap committed");
    }

    /// Validate an LP interest payment without touching state
    pub fn plan_interest(&self, asset: Address, amount: u128) -> Result<InterestPlan> {
        let state = self.supported_state(&asset)?;
        state
            .reserve
            .checked_add(amount)
            .ok_or(MathError::Overflow("interest"))?;
        Ok(InterestPlan { asset, amount })
    }

    /// Apply an LP interest payment (raises the share price)
    pub fn commit_interest(&mut self, plan: InterestPlan) {
        if let Some(state) = self.assets.get_mut(&plan.asset) {
            state.reserve = state.reserve.saturating_add(plan.amount);
        }
        debug!(asset = %plan.asset, amount = plan.amount, "Interest credited to pool");
    }

    fn supported_state(&self, asset: &Address) -> Result<&AssetState> {
        self.assets
            .get(asset)
            .filter(|state| state.utilization.limit > 0)
            .ok_or(PoolError::UnsupportedAsset(*asset))
    }

    /// Total value in 18-decimal units: reserves plus credits lent out
    pub fn pool_value(&self) -> Result<u128> {
        let mut value = self.credit_balance;
        for state in self.assets.values() {
            value = value
                .checked_add(to_wad(state.reserve, state.scalar)?)
                .ok_or(MathError::Overflow("pool value"))?;
        }
        Ok(value)
    }

    /// Account holding the pool's tokens
    pub fn account(&self) -> Address {
        self.account
    }

    /// Supported assets in registration order
    pub fn supported_assets(&self) -> &[Address] {
        &self.supported
    }

    /// Asset deposit utilization
    pub fn asset_utilization(&self, asset: &Address) -> Option<Utilization> {
        self.assets.get(asset).map(|state| state.utilization)
    }

    /// Full asset state
    pub fn asset_state(&self, asset: &Address) -> Option<&AssetState> {
        self.assets.get(asset)
    }

    /// Ledger swap utilization
    pub fn core_swap_utilization(&self, core: &Address) -> Option<Utilization> {
        self.cores.get(core).copied()
    }

    /// Credits held by the pool
    pub fn credit_balance(&self) -> u128 {
        self.credit_balance
    }

    /// Tokens of `asset` held by the pool
    pub fn reserve(&self, asset: &Address) -> u128 {
        self.assets.get(asset).map(|state| state.reserve).unwrap_or(0)
    }

    /// Shares outstanding
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Shares held by `holder`
    pub fn shares_of(&self, holder: &Address) -> u128 {
        self.shares.get(holder).copied().unwrap_or(0)
    }

    /// Role table
    pub fn authorization(&self) -> &Authorization {
        &self.auth
    }
}
