use serde::{Deserialize, Serialize};

/// Blocks a coinbase output must wait before it can be spent.
pub const COINBASE_PENDING_BLOCK_NUMBER: u64 = 6;

/// Persisted state of one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub is_coinbase: bool,
    pub block_height: u64,
    pub spent: bool,
}

impl UtxoEntry {
    pub fn new(is_coinbase: bool, block_height: u64, spent: bool) -> Self {
        Self {
            is_coinbase,
            block_height,
            spent,
        }
    }

    pub fn spend_output(&mut self) {
        self.spent = true;
    }

    pub fn unspend_output(&mut self) {
        self.spent = false;
    }

    /// Whether this output may be spent in a block at `height`.
    pub fn is_mature_at(&self, height: u64) -> bool {
        !self.is_coinbase || self.block_height + COINBASE_PENDING_BLOCK_NUMBER <= height
    }
}
