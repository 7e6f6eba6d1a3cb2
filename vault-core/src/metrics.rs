//! Metrics collection for observability
//!
//! Prometheus metrics for the market actor, each instance with its own
//! registry.
//!
//! # Metrics
//!
//! - `vault_operations_total{op}` - Successful operations
//! - `vault_rejections_total{op,kind}` - Rejected operations by error kind
//! - `vault_events_journaled_total` - Events written to storage
//! - `vault_journal_events_dropped_total` - Events discarded after journal failures
//! - `vault_journal_batch_size` - Histogram of journal batch sizes
//! - `vault_operation_duration_seconds` - Histogram of operation latencies
//! - `vault_borrow_index{ledger}` - Borrow index per ledger
//! - `vault_total_debt{ledger}` - Outstanding debt per ledger (credits)

use credit_primitives::ErrorKind;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Successful operations
    pub operations_total: IntCounterVec,

    /// Rejected operations
    pub rejections_total: IntCounterVec,

    /// Events journaled
    pub events_journaled: IntCounter,

    /// Events discarded because the journal kept failing
    pub events_dropped: IntCounter,

    /// Journal batch size histogram
    pub batch_size: Histogram,

    /// Operation duration histogram
    pub operation_duration: Histogram,

    /// Borrow index per ledger
    pub borrow_index: GaugeVec,

    /// Outstanding debt per ledger
    pub total_debt: GaugeVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new("vault_operations_total", "Successful operations"),
            &["op"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("vault_rejections_total", "Rejected operations by error kind"),
            &["op", "kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let events_journaled = IntCounter::new(
            "vault_events_journaled_total",
            "Events written to storage",
        )?;
        registry.register(Box::new(events_journaled.clone()))?;

        let events_dropped = IntCounter::new(
            "vault_journal_events_dropped_total",
            "Events discarded after journal failures",
        )?;
        registry.register(Box::new(events_dropped.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("vault_journal_batch_size", "Histogram of journal batch sizes")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        let operation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "vault_operation_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100]),
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let borrow_index = GaugeVec::new(
            Opts::new("vault_borrow_index", "Borrow index per ledger"),
            &["ledger"],
        )?;
        registry.register(Box::new(borrow_index.clone()))?;

        let total_debt = GaugeVec::new(
            Opts::new("vault_total_debt", "Outstanding debt per ledger (credits)"),
            &["ledger"],
        )?;
        registry.register(Box::new(total_debt.clone()))?;

        Ok(Self {
            operations_total,
            rejections_total,
            events_journaled,
            events_dropped,
            batch_size,
            operation_duration,
            borrow_index,
            total_debt,
            registry,
        })
    }

    /// Record a successful operation
    pub fn record_operation(&self, op: &str, duration_secs: f64) {
        self.operations_total.with_label_values(&[op]).inc();
        self.operation_duration.observe(duration_secs);
    }

    /// Record a rejected operation
    pub fn record_rejection(&self, op: &str, kind: ErrorKind) {
        self.rejections_total
            .with_label_values(&[op, kind.as_str()])
            .inc();
    }

    /// Record a journal flush
    pub fn record_batch(&self, size: usize) {
        self.events_journaled.inc_by(size as u64);
        self.batch_size.observe(size as f64);
    }

    /// Record events discarded without being journaled
    pub fn record_dropped(&self, count: usize) {
        self.events_dropped.inc_by(count as u64);
    }

    /// Update a ledger's gauges
    pub fn set_ledger_state(&self, ledger: &str, borrow_index: f64, total_debt: f64) {
        self.borrow_index
            .with_label_values(&[ledger])
            .set(borrow_index);
        self.total_debt.with_label_values(&[ledger]).set(total_debt);
    }

    /// Render in Prometheus text format
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
