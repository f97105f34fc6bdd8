//! # Pool Index
//!
//! The pooled set with a fee-ordered index for eviction.
//!
//! - `by_id`: O(1) lookup by transaction id
//! - `by_fee`: O(log n) lowest `fee_per_kb` first, ties by id

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use shared_types::Hash;

use super::entities::{Timestamp, TxDesc};

#[derive(Debug, Default)]
pub struct PoolIndex {
    by_id: HashMap<Hash, Arc<TxDesc>>,
    by_fee: BTreeSet<(u64, Hash)>,
}

impl PoolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: &Hash) -> Option<&Arc<TxDesc>> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &Hash) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<TxDesc>> {
        self.by_id.values()
    }

    /// Insert, replacing any entry with the same id.
    pub fn insert(&mut self, desc: Arc<TxDesc>) {
        let id = desc.id();
        self.remove(&id);
        self.by_fee.insert((desc.fee_per_kb, id));
        self.by_id.insert(id, desc);
    }

    pub fn remove(&mut self, id: &Hash) -> Option<Arc<TxDesc>> {
        let desc = self.by_id.remove(id)?;
        self.by_fee.remove(&(desc.fee_per_kb, *id));
        Some(desc)
    }

    /// Cheapest entry by `fee_per_kb`.
    pub fn lowest(&self) -> Option<(u64, Hash)> {
        self.by_fee.first().copied()
    }

    /// Ids admitted before `cutoff`.
    pub fn added_before(&self, cutoff: Timestamp) -> Vec<Hash> {
        self.by_id
            .iter()
            .filter(|(_, desc)| desc.added < cutoff)
            .map(|(id, _)| *id)
            .collect()
    }
}
