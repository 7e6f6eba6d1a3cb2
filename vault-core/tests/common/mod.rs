//! Shared market fixture for integration tests

#![allow(dead_code)]

use assessor::Assessor;
use credit_primitives::{
    Address, CallContext, InMemoryBank, ProtocolTag, Role, ScoreProof, WAD,
};
use liquidity_pool::LiquidityPool;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use score_registry::{leaf_hash, MerkleTree, ScoreRegistry};
use vault_core::{LedgerParams, Market, SharedPriceOracle, VaultLedger};

pub const T0: u64 = 1_700_000_000;
pub const ROOT_DELAY: u64 = 600;
/// One whole USDC (6 decimals)
pub const USDC: u128 = 1_000_000;

pub struct Harness {
    pub market: Market,
    pub oracle: SharedPriceOracle,
    pub ledger: Address,
    pub owner: Address,
    pub alice: Address,
    pub bob: Address,
    /// Holds 2e29 base units of collateral
    pub whale: Address,
    pub liquidator: Address,
    pub fee_collector: Address,
    pub collateral: Address,
    pub usdc: Address,
    pub credit: ProtocolTag,
    pub limit: ProtocolTag,
}

/// Market with one ledger: 18-decimal collateral at price 10, c-ratio
/// bounds [1, 2], and a pool holding 1,000,000 USDC
pub fn harness() -> Harness {
    harness_with(|_| {})
}

pub fn harness_with(configure: impl FnOnce(&mut LedgerParams)) -> Harness {
    let owner = Address::from_label("owner");
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");
    let whale = Address::from_label("whale");
    let liquidator = Address::from_label("liquidator");
    let fee_collector = Address::from_label("fee-collector");
    let collateral = Address::from_label("collateral");
    let usdc = Address::from_label("usdc");
    let ledger_id = Address::from_label("ledger");
    let ctx = CallContext::new(owner, T0);

    let mut bank = InMemoryBank::new();
    bank.register_token(collateral, 18).unwrap();
    bank.register_token(usdc, 6).unwrap();
    bank.mint(collateral, alice, 10_000 * WAD).unwrap();
    bank.mint(collateral, bob, 10_000 * WAD).unwrap();
    bank.mint(collateral, whale, 200_000_000_000 * WAD).unwrap();
    bank.mint(usdc, owner, 1_000_000 * USDC).unwrap();
    bank.mint(usdc, liquidator, 100_000 * USDC).unwrap();
    bank.mint(usdc, alice, 1_000 * USDC).unwrap();

    let mut pool = LiquidityPool::new(owner, Address::from_label("pool"));
    pool.set_deposit_limit(&ctx, &bank, usdc, u128::MAX).unwrap();
    pool.set_core_swap_limit(&ctx, ledger_id, u128::MAX).unwrap();
    pool.deposit(&ctx, &mut bank, usdc, 1_000_000 * USDC).unwrap();

    let mut params = LedgerParams::new(collateral, dec!(1), dec!(2), fee_collector);
    configure(&mut params);
    let credit = params.credit_protocol;
    let limit = params.limit_protocol;
    let mut ledger = VaultLedger::new(ledger_id, owner, params, &bank, T0).unwrap();
    ledger.grant_role(&ctx, Role::PauseOperator, owner).unwrap();
    ledger.grant_role(&ctx, Role::InterestSetter, owner).unwrap();

    let mut registry = ScoreRegistry::new(owner, [0u8; 32], ROOT_DELAY, T0).unwrap();
    registry.grant_role(&ctx, Role::RootUpdater, owner).unwrap();
    registry.grant_role(&ctx, Role::PauseOperator, owner).unwrap();

    let oracle = SharedPriceOracle::new(dec!(10), T0);
    let mut market = Market::new(
        registry,
        Assessor::new(owner, 1_000).unwrap(),
        pool,
        Box::new(bank),
    );
    market.add_ledger(ledger, Box::new(oracle.clone())).unwrap();

    Harness {
        market,
        oracle,
        ledger: ledger_id,
        owner,
        alice,
        bob,
        whale,
        liquidator,
        fee_collector,
        collateral,
        usdc,
        credit,
        limit,
    }
}

impl Harness {
    pub fn ctx(&self, caller: Address, now: u64) -> CallContext {
        CallContext::new(caller, now)
    }

    /// Publish `leaves` and rotate until they are current (two promotions)
    ///
    /// Returns the tree and the time of the second promotion; the oracle is
    /// refreshed to that time at `price`.
    pub fn publish(
        &mut self,
        leaves: &[(Address, ProtocolTag, u128)],
        price: Decimal,
    ) -> (MerkleTree, u64) {
        let mut tree = MerkleTree::from_leaves(
            leaves
                .iter()
                .map(|(account, protocol, score)| leaf_hash(account, protocol, *score))
                .collect(),
        );
        let root = tree.root();
        let first = T0 + ROOT_DELAY;
        let second = T0 + 2 * ROOT_DELAY;
        self.market
            .update_root(&CallContext::new(self.owner, first), root)
            .unwrap();
        self.market
            .update_root(&CallContext::new(self.owner, second), [0xee; 32])
            .unwrap();
        self.oracle.set(price, second);
        (tree, second)
    }

    pub fn proof(
        &self,
        tree: &MerkleTree,
        index: usize,
        leaf: (Address, ProtocolTag, u128),
    ) -> ScoreProof {
        ScoreProof::new(leaf.0, leaf.1, leaf.2, tree.proof(index).unwrap())
    }

    pub fn balance(&self, asset: Address, holder: Address) -> u128 {
        self.market.bank().balance_of(&asset, &holder)
    }

    pub fn debt(&self, account: Address, now: u64) -> u128 {
        self.market
            .ledger(&self.ledger)
            .unwrap()
            .current_debt(&account, now)
            .unwrap()
    }
}
