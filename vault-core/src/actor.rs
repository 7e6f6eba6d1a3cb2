//! Actor-based concurrency for the market
//!
//! Single-writer pattern using a Tokio actor:
//! - One task owns the `Market`, so every operation sees a consistent state
//! - Callers hold a cloneable `MarketHandle` and await a oneshot response
//! - Events from successful operations are batched into the journal on a
//!   size or time trigger
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               MarketHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              MarketActor (Single Task)                │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ Market: ledgers, registry, assessor, pool      │  │
//! │  │ Batch: Vec<EventRecord>                        │  │
//! │  │ Timer: 10ms or 100 events → flush_batch()      │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                               │
//! │                       ▼                               │
//! │         EventJournal::append_batch()                  │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::config::BatchingConfig;
use crate::events::EventRecord;
use crate::market::Market;
use crate::metrics::Metrics;
use crate::storage::EventJournal;
use crate::types::VaultView;
use crate::{Error, Result};
use credit_primitives::{Address, CallContext, ScoreProof, WAD};
use liquidity_pool::WithdrawTarget;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration};

/// Message sent to the market actor
#[derive(Debug)]
pub enum MarketMessage {
    /// Deposit collateral
    Deposit {
        /// Target ledger
        ledger: Address,
        /// Caller and time
        ctx: CallContext,
        /// Collateral (native units)
        amount: u128,
        /// Optional credit proof
        proof: Option<ScoreProof>,
        /// Reply
        response: oneshot::Sender<Result<EventRecord>>,
    },

    /// Borrow credits
    Borrow {
        /// Target ledger
        ledger: Address,
        /// Caller and time
        ctx: CallContext,
        /// Credits (18 decimals)
        amount: u128,
        /// Stablecoin to receive
        asset: Address,
        /// Optional credit proof
        credit_proof: Option<ScoreProof>,
        /// Optional limit proof
        limit_proof: Option<ScoreProof>,
        /// Reply
        response: oneshot::Sender<Result<EventRecord>>,
    },

    /// Repay debt
    Repay {
        /// Target ledger
        ledger: Address,
        /// Caller and time
        ctx: CallContext,
        /// Credits (18 decimals)
        amount: u128,
        /// Stablecoin to pay with
        asset: Address,
        /// Optional credit proof
        proof: Option<ScoreProof>,
        /// Reply
        response: oneshot::Sender<Result<EventRecord>>,
    },

    /// Withdraw collateral
    Withdraw {
        /// Target ledger
        ledger: Address,
        /// Caller and time
        ctx: CallContext,
        /// Collateral (native units)
        amount: u128,
        /// Optional credit proof
        proof: Option<ScoreProof>,
        /// Reply
        response: oneshot::Sender<Result<EventRecord>>,
    },

    /// Liquidate a vault
    Liquidate {
        /// Target ledger
        ledger: Address,
        /// Liquidator and time
        ctx: CallContext,
        /// Vault owner
        account: Address,
        /// Stablecoin to pay with
        asset: Address,
        /// Optional credit proof for the vault owner
        proof: Option<ScoreProof>,
        /// Reply
        response: oneshot::Sender<Result<EventRecord>>,
    },

    /// Deposit stables into the pool
    PoolDeposit {
        /// LP and time
        ctx: CallContext,
        /// Stablecoin
        asset: Address,
        /// Native units
        amount: u128,
        /// Reply with shares minted
        response: oneshot::Sender<Result<u128>>,
    },

    /// Redeem pool shares
    PoolWithdraw {
        /// LP and time
        ctx: CallContext,
        /// Shares to burn
        shares: u128,
        /// Payout selection
        target: WithdrawTarget,
        /// Reply with payouts
        response: oneshot::Sender<Result<Vec<(Address, u128)>>>,
    },

    /// Publish a score root
    UpdateRoot {
        /// Publisher and time
        ctx: CallContext,
        /// New root
        root: [u8; 32],
        /// Reply
        response: oneshot::Sender<Result<()>>,
    },

    /// Read a vault
    GetVault {
        /// Ledger
        ledger: Address,
        /// Vault owner
        account: Address,
        /// Time to accrue to
        now: u64,
        /// Reply
        response: oneshot::Sender<Result<VaultView>>,
    },

    /// Read an account's journaled events
    GetAccountEvents {
        /// Account
        account: Address,
        /// Reply
        response: oneshot::Sender<Result<Vec<EventRecord>>>,
    },

    /// Flush batch immediately (for testing/shutdown)
    FlushJournal {
        /// Reply
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the market
#[derive(Debug)]
pub struct MarketActor {
    market: Market,
    journal: Option<Arc<dyn EventJournal>>,
    metrics: Metrics,
    mailbox: mpsc::Receiver<MarketMessage>,
    batch: Vec<EventRecord>,
    max_batch_size: usize,
    max_pending_events: usize,
    batch_timeout: Duration,
    batching_enabled: bool,
}

impl MarketActor {
    /// Create new actor
    pub fn new(
        market: Market,
        journal: Option<Arc<dyn EventJournal>>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<MarketMessage>,
        batching: &BatchingConfig,
    ) -> Self {
        Self {
            market,
            journal,
            metrics,
            mailbox,
            batch: Vec::with_capacity(batching.max_batch_size),
            max_batch_size: batching.max_batch_size.max(1),
            max_pending_events: batching.max_pending_events.max(batching.max_batch_size),
            batch_timeout: Duration::from_millis(batching.batch_timeout_ms.max(1)),
            batching_enabled: batching.enabled,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let mut batch_timer = interval(self.batch_timeout);
        batch_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(msg) = self.mailbox.recv() => {
                    if let MarketMessage::Shutdown = msg {
                        if let Err(e) = self.flush_batch() {
                            tracing::error!("Error flushing journal on shutdown: {}", e);
                        }
                        break;
                    }
                    self.handle_message(msg);

                    if self.batch.len() >= self.max_batch_size || !self.batching_enabled {
                        if let Err(e) = self.flush_batch() {
                            tracing::error!("Error flushing journal: {}", e);
                        }
                    }
                }

                _ = batch_timer.tick(), if !self.batch.is_empty() => {
                    if let Err(e) = self.flush_batch() {
                        tracing::error!("Error flushing journal on timeout: {}", e);
                    }
                }

                else => {
                    if let Err(e) = self.flush_batch() {
                        tracing::error!("Error flushing journal on close: {}", e);
                    }
                    break;
                }
            }
        }

        tracing::info!("Market actor stopped");
    }

    fn handle_message(&mut self, msg: MarketMessage) {
        match msg {
            MarketMessage::Deposit {
                ledger,
                ctx,
                amount,
                proof,
                response,
            } => {
                let result = self.execute("deposit", |m| {
                    m.deposit(&ledger, &ctx, amount, proof.as_ref())
                });
                self.after_ledger_op(&ledger, ctx.now);
                let _ = response.send(result);
            }

            MarketMessage::Borrow {
                ledger,
                ctx,
                amount,
                asset,
                credit_proof,
                limit_proof,
                response,
            } => {
                let result = self.execute("borrow", |m| {
                    m.borrow(
                        &ledger,
                        &ctx,
                        amount,
                        asset,
                        credit_proof.as_ref(),
                        limit_proof.as_ref(),
                    )
                });
                self.after_ledger_op(&ledger, ctx.now);
                let _ = response.send(result);
            }

            MarketMessage::Repay {
                ledger,
                ctx,
                amount,
                asset,
                proof,
                response,
            } => {
                let result = self.execute("repay", |m| {
                    m.repay(&ledger, &ctx, amount, asset, proof.as_ref())
                });
                self.after_ledger_op(&ledger, ctx.now);
                let _ = response.send(result);
            }

            MarketMessage::Withdraw {
                ledger,
                ctx,
                amount,
                proof,
                response,
            } => {
                let result = self.execute("withdraw", |m| {
                    m.withdraw(&ledger, &ctx, amount, proof.as_ref())
                });
                self.after_ledger_op(&ledger, ctx.now);
                let _ = response.send(result);
            }

            MarketMessage::Liquidate {
                ledger,
                ctx,
                account,
                asset,
                proof,
                response,
            } => {
                let result = self.execute("liquidate", |m| {
                    m.liquidate(&ledger, &ctx, account, asset, proof.as_ref())
                });
                self.after_ledger_op(&ledger, ctx.now);
                let _ = response.send(result);
            }

            MarketMessage::PoolDeposit {
                ctx,
                asset,
                amount,
                response,
            } => {
                let result = self.execute("pool_deposit", |m| m.pool_deposit(&ctx, asset, amount));
                let _ = response.send(result);
            }

            MarketMessage::PoolWithdraw {
                ctx,
                shares,
                target,
                response,
            } => {
                let result =
                    self.execute("pool_withdraw", |m| m.pool_withdraw(&ctx, shares, target));
                let _ = response.send(result);
            }

            MarketMessage::UpdateRoot {
                ctx,
                root,
                response,
            } => {
                let result = self.execute("update_root", |m| m.update_root(&ctx, root));
                let _ = response.send(result);
            }

            MarketMessage::GetVault {
                ledger,
                account,
                now,
                response,
            } => {
                let result = self
                    .market
                    .ledger(&ledger)
                    .and_then(|l| l.view(&account, now));
                let _ = response.send(result);
            }

            MarketMessage::GetAccountEvents { account, response } => {
                let result = match self.flush_batch() {
                    Ok(()) => match &self.journal {
                        Some(journal) => journal.account_events(&account),
                        None => Err(Error::Storage("Journal disabled".to_string())),
                    },
                    Err(e) => Err(e),
                };
                let _ = response.send(result);
            }

            MarketMessage::FlushJournal { response } => {
                let _ = response.send(self.flush_batch());
            }

            MarketMessage::Shutdown => {}
        }
    }

    /// Run an operation against the market and record its outcome
    fn execute<T>(&mut self, op: &'static str, f: impl FnOnce(&mut Market) -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let result = f(&mut self.market);
        match &result {
            Ok(_) => self
                .metrics
                .record_operation(op, started.elapsed().as_secs_f64()),
            Err(e) => {
                self.metrics.record_rejection(op, e.kind());
                tracing::debug!(op, kind = %e.kind(), error = %e, "Operation rejected");
            }
        }
        result
    }

    /// Move recorded events into the batch and refresh ledger gauges
    fn after_ledger_op(&mut self, ledger: &Address, now: u64) {
        self.batch.extend(self.market.drain_events());

        if let Ok(l) = self.market.ledger(ledger) {
            let index = l.borrow_index().value().to_f64().unwrap_or(0.0);
            let debt = l.total_debt(now).unwrap_or(0) as f64 / WAD as f64;
            self.metrics
                .set_ledger_state(&ledger.to_string(), index, debt);
        }
    }

    /// Write the batch to the journal
    ///
    /// Without a journal the batch is discarded; the market state is already
    /// committed either way. A failed write keeps the batch for the next
    /// flush until it reaches `max_pending_events`, then drops it.
    fn flush_batch(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append_batch(&self.batch) {
                if self.batch.len() >= self.max_pending_events {
                    let dropped = self.batch.len();
                    self.metrics.record_dropped(dropped);
                    tracing::error!(
                        dropped,
                        first_sequence = self.batch[0].sequence,
                        "Journal unavailable, dropping pending events"
                    );
                    self.batch.clear();
                }
                return Err(e);
            }
            self.metrics.record_batch(self.batch.len());
            tracing::debug!(batch_size = self.batch.len(), "Journal batch flushed");
        }
        self.batch.clear();
        Ok(())
    }
}

/// Handle to communicate with the market actor
#[derive(Clone, Debug)]
pub struct MarketHandle {
    sender: mpsc::Sender<MarketMessage>,
}

impl MarketHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<MarketMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> MarketMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Deposit collateral
    pub async fn deposit(
        &self,
        ledger: Address,
        ctx: CallContext,
        amount: u128,
        proof: Option<ScoreProof>,
    ) -> Result<EventRecord> {
        self.request(|response| MarketMessage::Deposit {
            ledger,
            ctx,
            amount,
            proof,
            response,
        })
        .await
    }

    /// Borrow credits
    pub async fn borrow(
        &self,
        ledger: Address,
        ctx: CallContext,
        amount: u128,
        asset: Address,
        credit_proof: Option<ScoreProof>,
        limit_proof: Option<ScoreProof>,
    ) -> Result<EventRecord> {
        self.request(|response| MarketMessage::Borrow {
            ledger,
            ctx,
            amount,
            asset,
            credit_proof,
            limit_proof,
            response,
        })
        .await
    }

    /// Repay debt
    pub async fn repay(
        &self,
        ledger: Address,
        ctx: CallContext,
        amount: u128,
        asset: Address,
        proof: Option<ScoreProof>,
    ) -> Result<EventRecord> {
        self.request(|response| MarketMessage::Repay {
            ledger,
            ctx,
            amount,
            asset,
            proof,
            response,
        })
        .await
    }

    /// Withdraw collateral
    pub async fn withdraw(
        &self,
        ledger: Address,
        ctx: CallContext,
        amount: u128,
        proof: Option<ScoreProof>,
    ) -> Result<EventRecord> {
        self.request(|response| MarketMessage::Withdraw {
            ledger,
            ctx,
            amount,
            proof,
            response,
        })
        .await
    }

    /// Liquidate a vault
    pub async fn liquidate(
        &self,
        ledger: Address,
        ctx: CallContext,
        account: Address,
        asset: Address,
        proof: Option<ScoreProof>,
    ) -> Result<EventRecord> {
        self.request(|response| MarketMessage::Liquidate {
            ledger,
            ctx,
            account,
            asset,
            proof,
            response,
        })
        .await
    }

    /// Deposit stables into the pool
    pub async fn pool_deposit(&self, ctx: CallContext, asset: Address, amount: u128) -> Result<u128> {
        self.request(|response| MarketMessage::PoolDeposit {
            ctx,
            asset,
            amount,
            response,
        })
        .await
    }

    /// Redeem pool shares
    pub async fn pool_withdraw(
        &self,
        ctx: CallContext,
        shares: u128,
        target: WithdrawTarget,
    ) -> Result<Vec<(Address, u128)>> {
        self.request(|response| MarketMessage::PoolWithdraw {
            ctx,
            shares,
            target,
            response,
        })
        .await
    }

    /// Publish a score root
    pub async fn update_root(&self, ctx: CallContext, root: [u8; 32]) -> Result<()> {
        self.request(|response| MarketMessage::UpdateRoot {
            ctx,
            root,
            response,
        })
        .await
    }

    /// Read a vault as of `now`
    pub async fn get_vault(&self, ledger: Address, account: Address, now: u64) -> Result<VaultView> {
        self.request(|response| MarketMessage::GetVault {
            ledger,
            account,
            now,
            response,
        })
        .await
    }

    /// Read an account's journaled events
    pub async fn get_account_events(&self, account: Address) -> Result<Vec<EventRecord>> {
        self.request(|response| MarketMessage::GetAccountEvents { account, response })
            .await
    }

    /// Flush pending events to the journal
    pub async fn flush(&self) -> Result<()> {
        self.request(|response| MarketMessage::FlushJournal { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MarketMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the market actor and return its handle
pub fn spawn_market_actor(
    market: Market,
    journal: Option<Arc<dyn EventJournal>>,
    metrics: Metrics,
    batching: &BatchingConfig,
) -> MarketHandle {
    let (sender, mailbox) = mpsc::channel(1000);
    let actor = MarketActor::new(market, journal, metrics, mailbox, batching);
    tokio::spawn(actor.run());
    MarketHandle::new(sender)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::LedgerEvent;
    use crate::ledger::VaultLedger;
    use crate::oracle::SharedPriceOracle;
    use crate::storage::Journal;
    use crate::types::LedgerParams;
    use assessor::Assessor;
    use credit_primitives::{ErrorKind, InMemoryBank, Role};
    use liquidity_pool::LiquidityPool;
    use rust_decimal::Decimal;
    use score_registry::ScoreRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const T0: u64 = 1_700_000_000;

    struct Setup {
        market: Market,
        ledger: Address,
        user: Address,
        usdc: Address,
    }

    fn setup() -> Setup {
        let owner = Address::from_label("owner");
        let user = Address::from_label("user");
        let collateral = Address::from_label("collateral");
        let usdc = Address::from_label("usdc");
        let ledger_id = Address::from_label("ledger");
        let ctx = CallContext::new(owner, T0);

        let mut bank = InMemoryBank::new();
        bank.register_token(collateral, 18).unwrap();
        bank.register_token(usdc, 6).unwrap();
        bank.mint(collateral, user, 100 * WAD).unwrap();
        bank.mint(usdc, owner, 1_000_000_000).unwrap();

        let mut pool = LiquidityPool::new(owner, Address::from_label("pool"));
        pool.set_deposit_limit(&ctx, &bank, usdc, u128::MAX).unwrap();
        pool.set_core_swap_limit(&ctx, ledger_id, u128::MAX).unwrap();
        pool.deposit(&ctx, &mut bank, usdc, 1_000_000_000).unwrap();

        let params = LedgerParams::new(collateral, Decimal::ONE, Decimal::TWO, owner);
        let ledger = VaultLedger::new(ledger_id, owner, params, &bank, T0).unwrap();

        let mut registry = ScoreRegistry::new(owner, [0u8; 32], 60, T0).unwrap();
        registry.grant_role(&ctx, Role::RootUpdater, owner).unwrap();

        let mut market = Market::new(
            registry,
            Assessor::new(owner, 1_000).unwrap(),
            pool,
            Box::new(bank),
        );
        market
            .add_ledger(ledger, Box::new(SharedPriceOracle::new(Decimal::TEN, T0)))
            .unwrap();

        Setup {
            market,
            ledger: ledger_id,
            user,
            usdc,
        }
    }

    #[tokio::test]
    async fn test_operations_journaled() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let journal = Arc::new(Journal::open(&config).unwrap());
        let metrics = Metrics::new().unwrap();
        let s = setup();

        let handle = spawn_market_actor(
            s.market,
            Some(journal.clone()),
            metrics.clone(),
            &config.batching,
        );
        let ctx = CallContext::new(s.user, T0);

        let deposit = handle.deposit(s.ledger, ctx, 10 * WAD, None).await.unwrap();
        assert_eq!(deposit.sequence, 0);
        let borrow = handle
            .borrow(s.ledger, ctx, 50 * WAD, s.usdc, None, None)
            .await
            .unwrap();
        assert_eq!(borrow.sequence, 1);
        assert!(matches!(borrow.event, LedgerEvent::Borrowed { .. }));

        // Rejections are counted but not journaled
        let err = handle
            .borrow(s.ledger, ctx, WAD, s.usdc, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Solvency);

        handle.flush().await.unwrap();
        let events = journal.account_events(&s.user).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(journal.latest_sequence().unwrap(), Some(1));

        let view = handle.get_vault(s.ledger, s.user, T0).await.unwrap();
        assert_eq!(view.debt, 50 * WAD);

        assert_eq!(
            metrics.operations_total.with_label_values(&["borrow"]).get(),
            1
        );
        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["borrow", "solvency"])
                .get(),
            1
        );

        handle.shutdown().await.unwrap();
    }

    /// Journal whose writes always fail
    #[derive(Debug, Default)]
    struct UnavailableJournal {
        attempts: AtomicUsize,
    }

    impl EventJournal for UnavailableJournal {
        fn append_batch(&self, _records: &[EventRecord]) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Storage("disk unavailable".to_string()))
        }

        fn account_events(&self, _account: &Address) -> Result<Vec<EventRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_journal_failure_bounds_backlog() {
        let s = setup();
        let journal = Arc::new(UnavailableJournal::default());
        let metrics = Metrics::new().unwrap();
        let batching = BatchingConfig {
            max_batch_size: 1,
            batch_timeout_ms: 1_000,
            enabled: true,
            max_pending_events: 3,
        };
        let handle = spawn_market_actor(
            s.market,
            Some(journal.clone()),
            metrics.clone(),
            &batching,
        );
        let ctx = CallContext::new(s.user, T0);

        // Operations still commit while the journal is down
        handle.deposit(s.ledger, ctx, WAD, None).await.unwrap();
        handle.deposit(s.ledger, ctx, WAD, None).await.unwrap();
        assert!(handle.flush().await.is_err());
        assert_eq!(metrics.events_dropped.get(), 0);

        // The third pending event reaches the cap; the flush after it
        // finds nothing left
        handle.deposit(s.ledger, ctx, WAD, None).await.unwrap();
        assert!(handle.flush().await.is_ok());
        assert_eq!(metrics.events_dropped.get(), 3);
        assert_eq!(metrics.events_journaled.get(), 0);
        assert!(metrics
            .encode()
            .unwrap()
            .contains("vault_journal_events_dropped_total 3"));

        let view = handle.get_vault(s.ledger, s.user, T0).await.unwrap();
        assert_eq!(view.vault.collateral_amount, 3 * WAD);
        assert!(journal.attempts.load(Ordering::SeqCst) >= 4);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_ledger_rejected() {
        let s = setup();
        let handle = spawn_market_actor(
            s.market,
            None,
            Metrics::new().unwrap(),
            &BatchingConfig::default(),
        );
        let err = handle
            .deposit(
                Address::from_label("missing"),
                CallContext::new(s.user, T0),
                WAD,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownLedger(_)));

        let err = handle.get_account_events(s.user).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_mailbox() {
        let s = setup();
        let handle = spawn_market_actor(
            s.market,
            None,
            Metrics::new().unwrap(),
            &BatchingConfig::default(),
        );
        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = handle
            .deposit(s.ledger, CallContext::new(s.user, T0), WAD, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Concurrency(_)));
    }
}
