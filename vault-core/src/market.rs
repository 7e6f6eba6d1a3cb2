//! Market: the ledgers plus everything they share
//!
//! Owns the score registry, assessor, liquidity pool and token bank, and
//! routes each call to one ledger with those components borrowed alongside.
//! Successful ledger operations are stamped with a sequence number and
//! queued for the journal.

use crate::error::{Error, Result};
use crate::events::{EventRecord, LedgerEvent};
use crate::ledger::{Collaborators, VaultLedger};
use crate::oracle::Oracle;
use assessor::Assessor;
use credit_primitives::{Address, CallContext, ScoreProof, TokenBank};
use liquidity_pool::{LiquidityPool, WithdrawTarget};
use score_registry::ScoreRegistry;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug)]
struct LedgerSlot {
    ledger: VaultLedger,
    oracle: Box<dyn Oracle>,
}

/// Collection of vault ledgers sharing one registry, assessor and pool
#[derive(Debug)]
pub struct Market {
    registry: ScoreRegistry,
    assessor: Assessor,
    pool: LiquidityPool,
    bank: Box<dyn TokenBank>,
    ledgers: BTreeMap<Address, LedgerSlot>,
    pending: Vec<EventRecord>,
    next_sequence: u64,
}

impl Market {
    /// Assemble a market with no ledgers
    pub fn new(
        registry: ScoreRegistry,
        assessor: Assessor,
        pool: LiquidityPool,
        bank: Box<dyn TokenBank>,
    ) -> Self {
        Self {
            registry,
            assessor,
            pool,
            bank,
            ledgers: BTreeMap::new(),
            pending: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Register a ledger with its price source
    pub fn add_ledger(&mut self, ledger: VaultLedger, oracle: Box<dyn Oracle>) -> Result<()> {
        let id = ledger.id();
        if self.ledgers.contains_key(&id) {
            return Err(Error::AlreadyInitialized(id));
        }
        self.ledgers.insert(id, LedgerSlot { ledger, oracle });
        Ok(())
    }

    /// Deposit collateral into a ledger
    pub fn deposit(
        &mut self,
        ledger: &Address,
        ctx: &CallContext,
        amount: u128,
        proof: Option<&ScoreProof>,
    ) -> Result<EventRecord> {
        let event = self.with_ledger(ledger, |l, c| l.deposit(ctx, c, amount, proof))?;
        Ok(self.record(*ledger, ctx.now, event))
    }

    /// Borrow credits from a ledger, paid out in `asset`
    pub fn borrow(
        &mut self,
        ledger: &Address,
        ctx: &CallContext,
        amount: u128,
        asset: Address,
        credit_proof: Option<&ScoreProof>,
        limit_proof: Option<&ScoreProof>,
    ) -> Result<EventRecord> {
        let event = self.with_ledger(ledger, |l, c| {
            l.borrow(ctx, c, amount, asset, credit_proof, limit_proof)
        })?;
        Ok(self.record(*ledger, ctx.now, event))
    }

    /// Repay debt in `asset`
    pub fn repay(
        &mut self,
        ledger: &Address,
        ctx: &CallContext,
        amount: u128,
        asset: Address,
        proof: Option<&ScoreProof>,
    ) -> Result<EventRecord> {
        let event = self.with_ledger(ledger, |l, c| l.repay(ctx, c, amount, asset, proof))?;
        Ok(self.record(*ledger, ctx.now, event))
    }

    /// Withdraw collateral
    pub fn withdraw(
        &mut self,
        ledger: &Address,
        ctx: &CallContext,
        amount: u128,
        proof: Option<&ScoreProof>,
    ) -> Result<EventRecord> {
        let event = self.with_ledger(ledger, |l, c| l.withdraw(ctx, c, amount, proof))?;
        Ok(self.record(*ledger, ctx.now, event))
    }

    /// Liquidate `account`'s vault, paying in `asset`
    pub fn liquidate(
        &mut self,
        ledger: &Address,
        ctx: &CallContext,
        account: Address,
        asset: Address,
        proof: Option<&ScoreProof>,
    ) -> Result<EventRecord> {
        let event =
            self.with_ledger(ledger, |l, c| l.liquidate(ctx, c, account, asset, proof))?;
        Ok(self.record(*ledger, ctx.now, event))
    }

    /// Deposit stables into the pool for shares
    pub fn pool_deposit(&mut self, ctx: &CallContext, asset: Address, amount: u128) -> Result<u128> {
        Ok(self.pool.deposit(ctx, self.bank.as_mut(), asset, amount)?)
    }

    /// Redeem pool shares
    pub fn pool_withdraw(
        &mut self,
        ctx: &CallContext,
        shares: u128,
        target: WithdrawTarget,
    ) -> Result<Vec<(Address, u128)>> {
        Ok(self.pool.withdraw(ctx, self.bank.as_mut(), shares, target)?)
    }

    /// Set a pool asset's deposit limit (pool owner only)
    pub fn set_deposit_limit(&mut self, ctx: &CallContext, asset: Address, limit: u128) -> Result<()> {
        Ok(self
            .pool
            .set_deposit_limit(ctx, self.bank.as_ref(), asset, limit)?)
    }

    /// Publish a score root
    pub fn update_root(&mut self, ctx: &CallContext, root: [u8; 32]) -> Result<()> {
        Ok(self.registry.update_root(ctx, root)?)
    }

    /// Take the events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Sequence number the next event will carry
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Resume numbering after a restart
    pub fn set_next_sequence(&mut self, sequence: u64) {
        self.next_sequence = sequence;
    }

    /// Ledger by ID
    pub fn ledger(&self, id: &Address) -> Result<&VaultLedger> {
        self.ledgers
            .get(id)
            .map(|slot| &slot.ledger)
            .ok_or(Error::UnknownLedger(*id))
    }

    /// Ledger by ID, for owner-level changes
    pub fn ledger_mut(&mut self, id: &Address) -> Result<&mut VaultLedger> {
        self.ledgers
            .get_mut(id)
            .map(|slot| &mut slot.ledger)
            .ok_or(Error::UnknownLedger(*id))
    }

    /// A ledger's price source
    pub fn oracle(&self, id: &Address) -> Result<&dyn Oracle> {
        self.ledgers
            .get(id)
            .map(|slot| slot.oracle.as_ref())
            .ok_or(Error::UnknownLedger(*id))
    }

    /// Registered ledger IDs
    pub fn ledger_ids(&self) -> Vec<Address> {
        self.ledgers.keys().copied().collect()
    }

    /// Score registry
    pub fn registry(&self) -> &ScoreRegistry {
        &self.registry
    }

    /// Score registry, for admin changes
    pub fn registry_mut(&mut self) -> &mut ScoreRegistry {
        &mut self.registry
    }

    /// Assessor
    pub fn assessor(&self) -> &Assessor {
        &self.assessor
    }

    /// Assessor, for admin changes
    pub fn assessor_mut(&mut self) -> &mut Assessor {
        &mut self.assessor
    }

    /// Liquidity pool
    pub fn pool(&self) -> &LiquidityPool {
        &self.pool
    }

    /// Liquidity pool, for admin changes
    pub fn pool_mut(&mut self) -> &mut LiquidityPool {
        &mut self.pool
    }

    /// Token bank
    pub fn bank(&self) -> &dyn TokenBank {
        self.bank.as_ref()
    }

    /// Token bank, for funding accounts
    pub fn bank_mut(&mut self) -> &mut dyn TokenBank {
        self.bank.as_mut()
    }

    fn with_ledger<T>(
        &mut self,
        id: &Address,
        op: impl FnOnce(&mut VaultLedger, &mut Collaborators<'_>) -> Result<T>,
    ) -> Result<T> {
        let slot = self.ledgers.get_mut(id).ok_or(Error::UnknownLedger(*id))?;
        let mut collab = Collaborators {
            registry: &self.registry,
            assessor: &self.assessor,
            pool: &mut self.pool,
            bank: self.bank.as_mut(),
            oracle: slot.oracle.as_ref(),
        };
        op(&mut slot.ledger, &mut collab)
    }

    fn record(&mut self, ledger: Address, timestamp: u64, event: LedgerEvent) -> EventRecord {
        let record = EventRecord::new(self.next_sequence, ledger, timestamp, event);
        self.next_sequence += 1;
        debug!(sequence = record.sequence, event = record.event.name(), "Event recorded");
        self.pending.push(record.clone());
        record
    }
}
