//! Configuration for the vault service
//!
//! Amounts are whole tokens written as decimal strings (`"1000.5"`); they are
//! scaled to base units when the market is built. Addresses are 20-byte hex.

use crate::error::{Error, Result};
use crate::ledger::VaultLedger;
use crate::market::Market;
use crate::oracle::SharedPriceOracle;
use crate::types::LedgerParams;
use assessor::Assessor;
use credit_primitives::math::{mul_amount, WAD};
use credit_primitives::{Address, CallContext, InMemoryBank, ProtocolTag, Role, Rounding, TokenBank};
use liquidity_pool::LiquidityPool;
use rust_decimal::Decimal;
use score_registry::ScoreRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for the event journal
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Metrics listen address
    pub metrics_listen_addr: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Batching configuration
    pub batching: BatchingConfig,

    /// Score registry
    pub registry: RegistryConfig,

    /// Assessor
    pub assessor: AssessorConfig,

    /// Liquidity pool
    pub pool: PoolConfig,

    /// Tokens known to the bank
    pub tokens: Vec<TokenConfig>,

    /// Genesis token balances
    pub balances: Vec<BalanceConfig>,

    /// Vault ledgers
    pub ledgers: Vec<LedgerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/vault"),
            service_name: "vault-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            metrics_listen_addr: "0.0.0.0:9090".to_string(),
            rocksdb: RocksDBConfig::default(),
            batching: BatchingConfig::default(),
            registry: RegistryConfig::default(),
            assessor: AssessorConfig::default(),
            pool: PoolConfig::default(),
            tokens: Vec::new(),
            balances: Vec::new(),
            ledgers: Vec::new(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Level 0 file num compaction trigger
    pub level0_file_num_compaction_trigger: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            target_file_size_mb: 64,
            max_background_jobs: 4,
            level0_file_num_compaction_trigger: 4,
            enable_statistics: false,
        }
    }
}

/// Journal batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Maximum batch size (events)
    pub max_batch_size: usize,

    /// Batch timeout (milliseconds)
    pub batch_timeout_ms: u64,

    /// Enable batching
    pub enabled: bool,

    /// Unjournaled events held while the journal is failing; past this the
    /// backlog is dropped and counted
    pub max_pending_events: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            batch_timeout_ms: 10,
            enabled: true,
            max_pending_events: 10_000,
        }
    }
}

/// Score registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Owner (may override the upcoming root while paused)
    pub owner: Address,

    /// Publishes roots
    pub root_updater: Address,

    /// Pauses root rotation
    pub pause_operator: Address,

    /// Hex root both current and upcoming start at
    pub genesis_root: Option<String>,

    /// Minimum seconds between promotions
    pub root_delay_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            owner: Address::ZERO,
            root_updater: Address::ZERO,
            pause_operator: Address::ZERO,
            genesis_root: None,
            root_delay_secs: 86_400,
        }
    }
}

impl RegistryConfig {
    /// Genesis root bytes (zero if unset)
    pub fn genesis_root_bytes(&self) -> Result<[u8; 32]> {
        let Some(text) = &self.genesis_root else {
            return Ok([0u8; 32]);
        };
        let bytes = hex::decode(text.trim_start_matches("0x"))
            .map_err(|e| Error::Config(format!("Invalid genesis root: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| Error::Config("Genesis root must be 32 bytes".to_string()))
    }
}

/// Assessor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessorConfig {
    /// Owner
    pub owner: Address,

    /// Score mapping to the lower c-ratio bound
    pub max_score: u64,
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            owner: Address::ZERO,
            max_score: 1_000,
        }
    }
}

/// Liquidity pool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Owner (sets limits)
    pub owner: Address,

    /// Account holding pool reserves
    pub account: Address,
}

/// Token registered with the bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token address
    pub address: Address,

    /// Token decimals (at most 18)
    pub decimals: u8,

    /// Pool deposit limit in whole tokens; set to make the token a pool asset
    #[serde(default)]
    pub deposit_limit: Option<Decimal>,
}

/// Genesis balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Token address
    pub token: Address,

    /// Holder
    pub holder: Address,

    /// Whole tokens
    pub amount: Decimal,
}

/// Vault ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger ID (also holds collateral and identifies the ledger to the pool)
    pub id: Address,

    /// Owner
    pub owner: Address,

    /// Collateral token
    pub collateral_asset: Address,

    /// Best c-ratio a perfect score can reach
    pub low_c_ratio: Decimal,

    /// C-ratio without a verified score
    pub high_c_ratio: Decimal,

    /// Interest per second
    #[serde(default)]
    pub interest_rate: Decimal,

    /// Borrow fee as a fraction of the amount
    #[serde(default)]
    pub borrow_fee: Decimal,

    /// Fraction of repaid interest going to pool LPs
    #[serde(default = "default_pool_interest_share")]
    pub pool_interest_share: Decimal,

    /// Liquidation price discount
    #[serde(default = "default_liquidator_discount")]
    pub liquidator_discount: Decimal,

    /// Fraction of the liquidation discount taken as a protocol fee
    #[serde(default)]
    pub liquidation_arc_fee: Decimal,

    /// Oldest acceptable price (seconds)
    #[serde(default = "default_max_price_staleness")]
    pub max_price_staleness_secs: u64,

    /// Cap on total ledger debt (whole credits, unlimited if unset)
    #[serde(default)]
    pub total_borrow_limit: Option<Decimal>,

    /// Smallest non-zero vault debt (whole credits)
    #[serde(default)]
    pub vault_borrow_minimum: Decimal,

    /// Largest vault debt (whole credits, unlimited if unset)
    #[serde(default)]
    pub vault_borrow_maximum: Option<Decimal>,

    /// Borrow limit without a limit proof (whole credits, unlimited if unset)
    #[serde(default)]
    pub default_borrow_limit: Option<Decimal>,

    /// Reject borrows without a verified limit proof
    #[serde(default)]
    pub require_limit_proof: bool,

    /// Pool swap limit for this ledger (whole credits, unlimited if unset)
    #[serde(default)]
    pub core_swap_limit: Option<Decimal>,

    /// Receives protocol fees
    pub fee_collector: Address,

    /// Credit proof protocol label
    #[serde(default = "default_credit_protocol")]
    pub credit_protocol: String,

    /// Limit proof protocol label
    #[serde(default = "default_limit_protocol")]
    pub limit_protocol: String,

    /// Require a credit proof on every borrow
    #[serde(default)]
    pub borrow_score_required: bool,

    /// Starting oracle price (credits per whole collateral token)
    pub initial_price: Decimal,

    /// Pauses the ledger
    #[serde(default)]
    pub pause_operator: Option<Address>,

    /// Changes the interest rate
    #[serde(default)]
    pub interest_setter: Option<Address>,
}

fn default_pool_interest_share() -> Decimal {
    Decimal::ONE
}

fn default_liquidator_discount() -> Decimal {
    Decimal::new(1, 1)
}

fn default_max_price_staleness() -> u64 {
    3_600
}

fn default_credit_protocol() -> String {
    "arcx.credit".to_string()
}

fn default_limit_protocol() -> String {
    "arcx.limit".to_string()
}

/// Whole tokens to base units at `decimals`
fn to_base_units(amount: Decimal, decimals: u8) -> Result<u128> {
    let unit = 10u128
        .checked_pow(u32::from(decimals))
        .ok_or_else(|| Error::Config(format!("Unsupported decimals {}", decimals)))?;
    Ok(mul_amount(unit, amount, Rounding::Down)?)
}

fn to_credits(amount: Decimal) -> Result<u128> {
    Ok(mul_amount(WAD, amount, Rounding::Down)?)
}

fn to_credit_limit(amount: Option<Decimal>) -> Result<u128> {
    amount.map_or(Ok(u128::MAX), to_credits)
}

impl LedgerConfig {
    /// Ledger parameters in base units
    pub fn to_params(&self) -> Result<LedgerParams> {
        let mut params = LedgerParams::new(
            self.collateral_asset,
            self.low_c_ratio,
            self.high_c_ratio,
            self.fee_collector,
        );
        params.interest_rate = self.interest_rate;
        params.borrow_fee = self.borrow_fee;
        params.pool_interest_share = self.pool_interest_share;
        params.liquidator_discount = self.liquidator_discount;
        params.liquidation_arc_fee = self.liquidation_arc_fee;
        params.max_price_staleness = self.max_price_staleness_secs;
        params.total_borrow_limit = to_credit_limit(self.total_borrow_limit)?;
        params.vault_borrow_minimum = to_credits(self.vault_borrow_minimum)?;
        params.vault_borrow_maximum = to_credit_limit(self.vault_borrow_maximum)?;
        params.default_borrow_limit = if self.require_limit_proof {
            None
        } else {
            Some(to_credit_limit(self.default_borrow_limit)?)
        };
        params.credit_protocol = ProtocolTag::from_label(&self.credit_protocol);
        params.limit_protocol = ProtocolTag::from_label(&self.limit_protocol);
        params.borrow_score_required = self.borrow_score_required;
        Ok(params)
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    ///
    /// `VAULT_CONFIG` names a TOML file to start from; `VAULT_DATA_DIR` and
    /// `VAULT_METRICS_ADDR` override individual fields.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("VAULT_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Config::default(),
        };

        if let Ok(data_dir) = std::env::var("VAULT_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(addr) = std::env::var("VAULT_METRICS_ADDR") {
            config.metrics_listen_addr = addr;
        }

        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        self.metrics_listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("Invalid metrics address: {}", e)))?;
        if self.batching.max_batch_size == 0 || self.batching.batch_timeout_ms == 0 {
            return Err(Error::Config(
                "Batch size and timeout must be positive".to_string(),
            ));
        }
        if self.batching.max_pending_events < self.batching.max_batch_size {
            return Err(Error::Config(
                "max_pending_events must be at least max_batch_size".to_string(),
            ));
        }
        if self.registry.root_delay_secs == 0 {
            return Err(Error::Config("Root delay must be positive".to_string()));
        }
        self.registry.genesis_root_bytes()?;

        let mut tokens = BTreeSet::new();
        for token in &self.tokens {
            if token.decimals > 18 {
                return Err(Error::Config(format!(
                    "Token {} has {} decimals (max 18)",
                    token.address, token.decimals
                )));
            }
            if !tokens.insert(token.address) {
                return Err(Error::Config(format!("Duplicate token {}", token.address)));
            }
        }

        let mut ledgers = BTreeSet::new();
        for ledger in &self.ledgers {
            if !ledgers.insert(ledger.id) {
                return Err(Error::Config(format!("Duplicate ledger {}", ledger.id)));
            }
            if !tokens.contains(&ledger.collateral_asset) {
                return Err(Error::Config(format!(
                    "Ledger {} uses unknown collateral {}",
                    ledger.id, ledger.collateral_asset
                )));
            }
            if ledger.initial_price <= Decimal::ZERO {
                return Err(Error::Config(format!(
                    "Ledger {} needs a positive initial price",
                    ledger.id
                )));
            }
            ledger
                .to_params()?
                .validate()
                .map_err(|e| Error::Config(format!("Ledger {}: {}", ledger.id, e)))?;
        }
        Ok(())
    }

    /// Build a market with an in-memory bank
    ///
    /// Returns the market and the settable oracle behind each ledger.
    pub fn build_market(&self, now: u64) -> Result<(Market, BTreeMap<Address, SharedPriceOracle>)> {
        self.validate()?;

        let mut bank = InMemoryBank::new();
        let mut decimals = BTreeMap::new();
        for token in &self.tokens {
            bank.register_token(token.address, token.decimals)?;
            decimals.insert(token.address, token.decimals);
        }
        for balance in &self.balances {
            let token_decimals = decimals.get(&balance.token).copied().ok_or_else(|| {
                Error::Config(format!("Balance for unknown token {}", balance.token))
            })?;
            bank.mint(
                balance.token,
                balance.holder,
                to_base_units(balance.amount, token_decimals)?,
            )?;
        }

        let registry_owner = CallContext::new(self.registry.owner, now);
        let mut registry = ScoreRegistry::new(
            self.registry.owner,
            self.registry.genesis_root_bytes()?,
            self.registry.root_delay_secs,
            now,
        )?;
        registry.grant_role(&registry_owner, Role::RootUpdater, self.registry.root_updater)?;
        registry.grant_role(&registry_owner, Role::PauseOperator, self.registry.pause_operator)?;

        let assessor = Assessor::new(self.assessor.owner, u128::from(self.assessor.max_score))?;

        let pool_owner = CallContext::new(self.pool.owner, now);
        let mut pool = LiquidityPool::new(self.pool.owner, self.pool.account);
        for token in &self.tokens {
            if let Some(limit) = token.deposit_limit {
                let limit = to_base_units(limit, token.decimals)?;
                pool.set_deposit_limit(&pool_owner, &bank, token.address, limit)?;
            }
        }

        let mut ledgers = Vec::new();
        let mut oracles = BTreeMap::new();
        for config in &self.ledgers {
            let ctx = CallContext::new(config.owner, now);
            let mut ledger =
                VaultLedger::new(config.id, config.owner, config.to_params()?, &bank, now)?;
            if let Some(operator) = config.pause_operator {
                ledger.grant_role(&ctx, Role::PauseOperator, operator)?;
            }
            if let Some(setter) = config.interest_setter {
                ledger.grant_role(&ctx, Role::InterestSetter, setter)?;
            }
            pool.set_core_swap_limit(
                &pool_owner,
                config.id,
                to_credit_limit(config.core_swap_limit)?,
            )?;

            let oracle = SharedPriceOracle::new(config.initial_price, now);
            oracles.insert(config.id, oracle.clone());
            ledgers.push((ledger, oracle));
        }

        let mut market = Market::new(registry, assessor, pool, Box::new(bank));
        for (ledger, oracle) in ledgers {
            market.add_ledger(ledger, Box::new(oracle))?;
        }

        tracing::info!(
            ledgers = market.ledger_ids().len(),
            assets = market.pool().supported_assets().len(),
            "Market built"
        );
        Ok((market, oracles))
    }
}
