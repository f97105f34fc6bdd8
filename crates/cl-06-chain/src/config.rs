//! Chain controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Capacity of the worker's request queue.
    pub request_queue_capacity: usize,
    /// Orphan blocks held before the oldest is evicted.
    pub max_orphan_blocks: usize,
    /// How long an orphan waits for its parent.
    pub orphan_ttl: Duration,
    /// Milliseconds between proposer slots.
    pub block_time_interval_ms: u64,
    /// Consecutive blocks each validator proposes per rotation.
    pub block_num_each_node: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            request_queue_capacity: 1024,
            max_orphan_blocks: 256,
            orphan_ttl: Duration::from_secs(60 * 60),
            block_time_interval_ms: 6000,
            block_num_each_node: 3,
        }
    }
}
