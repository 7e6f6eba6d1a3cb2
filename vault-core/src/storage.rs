//! Event journal on RocksDB
//!
//! # Column Families
//!
//! - `events` - Append-only event log (key: sequence, big-endian)
//! - `accounts` - Per-account index (key: account || sequence)
//!
//! The journal is write-only from the market's point of view; it exists for
//! audit and for external observers, and never feeds back into ledger state.

use crate::{
    error::{Error, Result},
    events::EventRecord,
    Config,
};
use credit_primitives::Address;
use rocksdb::{
    BlockBasedOptions, ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle,
    DBCompressionType, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::Arc;

/// Column family names
const CF_EVENTS: &str = "events";
const CF_ACCOUNTS: &str = "accounts";

/// Destination for committed ledger events
pub trait EventJournal: Send + Sync + std::fmt::Debug {
    /// Write a batch of records atomically
    fn append_batch(&self, records: &[EventRecord]) -> Result<()>;

    /// All records concerning `account`, in sequence order
    fn account_events(&self, account: &Address) -> Result<Vec<EventRecord>>;
}

/// Journal of ledger events
#[derive(Debug)]
pub struct Journal {
    db: Arc<DB>,
}

impl Journal {
    /// Open or create the journal under `config.data_dir`
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Append-only log
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_events()),
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        tracing::info!("Opened event journal at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_events() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(DBCompressionType::Zstd);
        opts
    }

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(DBCompressionType::Lz4);
        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Write a batch of records atomically
    pub fn append_batch(&self, records: &[EventRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let cf_events = self.cf_handle(CF_EVENTS)?;
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let mut batch = WriteBatch::default();

        for record in records {
            let value = bincode::serialize(record)?;
            batch.put_cf(cf_events, record.sequence.to_be_bytes(), &value);
            batch.put_cf(
                cf_accounts,
                Self::account_key(&record.event.account(), record.sequence),
                [],
            );
        }

        self.db.write(batch)?;
        tracing::debug!(count = records.len(), "Journal batch written");
        Ok(())
    }

    /// Record by sequence number
    pub fn get_event(&self, sequence: u64) -> Result<Option<EventRecord>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        match self.db.get_cf(cf, sequence.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// All records concerning `account`, in sequence order
    pub fn account_events(&self, account: &Address) -> Result<Vec<EventRecord>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let prefix = account.as_bytes();

        let mut records = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, prefix) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let sequence_bytes: [u8; 8] = key[prefix.len()..]
                .try_into()
                .map_err(|_| Error::Storage("Malformed account index key".to_string()))?;
            let sequence = u64::from_be_bytes(sequence_bytes);
            let record = self.get_event(sequence)?.ok_or_else(|| {
                Error::Storage(format!("Indexed event {} missing", sequence))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Highest sequence number written
    pub fn latest_sequence(&self) -> Result<Option<u64>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        if let Some(item) = self.db.iterator_cf(cf, IteratorMode::End).next() {
            let (key, _) = item?;
            let bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Malformed event key".to_string()))?;
            return Ok(Some(u64::from_be_bytes(bytes)));
        }
        Ok(None)
    }

    fn account_key(account: &Address, sequence: u64) -> Vec<u8> {
        let mut key = account.as_bytes().to_vec();
        key.extend_from_slice(&sequence.to_be_bytes());
        key
    }
}

impl EventJournal for Journal {
    fn append_batch(&self, records: &[EventRecord]) -> Result<()> {
        Journal::append_batch(self, records)
    }

    fn account_events(&self, account: &Address) -> Result<Vec<EventRecord>> {
        Journal::account_events(self, account)
    }
}
