//! Finality configuration.

use serde::{Deserialize, Serialize};
use shared_types::PublicKey;

/// Casper parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CasperConfig {
    /// Blocks per epoch; checkpoints sit at multiples of this height.
    pub blocks_of_epoch: u64,
    /// Maximum size of the effective validator set.
    pub max_validators: usize,
    /// Minimum native stake for a key to become a validator.
    pub min_validator_vote: u64,
    /// Validators used, with weight 1 each, while no key holds enough stake.
    pub federation: Vec<PublicKey>,
    /// Capacity of the previous-checkpoint and pending-verification caches.
    pub cache_size: usize,
}

impl Default for CasperConfig {
    fn default() -> Self {
        Self {
            blocks_of_epoch: 100,
            max_validators: 10,
            min_validator_vote: 1_000_000_000_000,
            federation: Vec::new(),
            cache_size: 1024,
        }
    }
}

impl CasperConfig {
    pub fn is_boundary(&self, height: u64) -> bool {
        height % self.blocks_of_epoch.max(1) == 0
    }
}
