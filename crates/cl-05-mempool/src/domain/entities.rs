//! Core mempool entities.

use std::time::Duration;

use cl_01_entry_graph::Tx;
use serde::{Deserialize, Serialize};
use shared_types::Hash;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// A pooled transaction and the bookkeeping block assembly ranks it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxDesc {
    pub tx: Tx,
    pub added: Timestamp,
    /// Only the gas (native asset) effects apply.
    pub status_fail: bool,
    /// Best height when admitted.
    pub height: u64,
    /// Size in kilobyte units, at least 1.
    pub weight: u64,
    pub fee: u64,
    pub fee_per_kb: u64,
}

impl TxDesc {
    pub fn new(tx: Tx, added: Timestamp, status_fail: bool, height: u64, weight: u64, fee: u64) -> Self {
        let weight = weight.max(1);
        Self {
            tx,
            added,
            status_fail,
            height,
            weight,
            fee,
            fee_per_kb: fee / weight,
        }
    }

    pub fn id(&self) -> Hash {
        self.tx.id()
    }
}

/// Mempool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MempoolConfig {
    /// Maximum pooled transactions (default: 10,000).
    pub max_transactions: usize,
    /// Ids remembered as invalid (default: 1,000).
    pub max_err_cache: usize,
    /// Age after which `expire_transactions` drops an entry (default: 24h).
    pub max_tx_age: Duration,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
            max_err_cache: 1_000,
            max_tx_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}
