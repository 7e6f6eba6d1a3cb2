//! Price oracle interface

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Price of one collateral token in credits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReading {
    /// Price
    pub value: Decimal,

    /// When the price was observed (seconds since Unix epoch)
    pub timestamp: u64,
}

/// Price source consulted once per operation
pub trait Oracle: Send + Sync + fmt::Debug {
    /// Latest price
    fn fetch_current_price(&self) -> PriceReading;
}

/// Settable oracle shared between the ledger and whoever feeds it
#[derive(Debug, Clone)]
pub struct SharedPriceOracle {
    reading: Arc<RwLock<PriceReading>>,
}

impl SharedPriceOracle {
    /// Create with an initial reading
    pub fn new(value: Decimal, timestamp: u64) -> Self {
        Self {
            reading: Arc::new(RwLock::new(PriceReading { value, timestamp })),
        }
    }

    /// Publish a new price
    pub fn set(&self, value: Decimal, timestamp: u64) {
        *self.reading.write() = PriceReading { value, timestamp };
    }
}

impl Oracle for SharedPriceOracle {
    fn fetch_current_price(&self) -> PriceReading {
        *self.reading.read()
    }
}
