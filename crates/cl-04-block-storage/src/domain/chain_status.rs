use serde::{Deserialize, Serialize};
use shared_types::Hash;

/// Persisted tip of the main chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub height: u64,
    pub hash: Hash,
}
