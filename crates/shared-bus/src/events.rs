//! # Ledger Events
//!
//! Everything the core announces to the rest of the node.

use serde::{Deserialize, Serialize};
use shared_types::{Hash, PublicKey};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // FINALITY
    // =========================================================================
    /// The local validator signed a finality vote that peers must receive.
    BlockVerification {
        source_height: u64,
        source_hash: Hash,
        target_height: u64,
        target_hash: Hash,
        pub_key: PublicKey,
        signature: Vec<u8>,
    },

    /// A checkpoint reached finality.
    CheckpointFinalized { height: u64, hash: Hash },

    // =========================================================================
    // CHAIN
    // =========================================================================
    /// A block was appended to the main chain.
    BlockConnected { height: u64, hash: Hash },

    /// The main chain switched branches.
    ChainReorganized {
        /// Height of the common ancestor.
        fork_height: u64,
        /// New best block hash.
        new_best: Hash,
    },

    // =========================================================================
    // TRANSACTION POOL
    // =========================================================================
    /// A transaction was admitted to the pool.
    NewTransaction { tx_id: Hash, fee_per_kb: u64 },
}

impl LedgerEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::BlockVerification { .. } | Self::CheckpointFinalized { .. } => {
                EventTopic::Finality
            }
            Self::BlockConnected { .. } | Self::ChainReorganized { .. } => EventTopic::Chain,
            Self::NewTransaction { .. } => EventTopic::Mempool,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Chain,
    Finality,
    Mempool,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
