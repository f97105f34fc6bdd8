use serde::{Deserialize, Serialize};

/// Store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Headers and blocks kept decoded in memory (default: 30).
    pub cached_blocks: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { cached_blocks: 30 }
    }
}
