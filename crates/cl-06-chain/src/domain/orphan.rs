//! Blocks whose parent has not arrived yet.
//!
//! Indexed twice: by hash, and by previous hash so that saving a block can
//! find the children waiting on it. Entries expire after a TTL; when the
//! pool is full the entry closest to expiry is evicted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cl_01_entry_graph::Block;
use shared_types::{hash_hex, Hash};
use tracing::debug;

#[derive(Debug, Clone)]
struct OrphanBlock {
    block: Block,
    expiration: Instant,
}

#[derive(Debug)]
pub struct OrphanManage {
    orphans: HashMap<Hash, OrphanBlock>,
    prev_orphans: HashMap<Hash, Vec<Hash>>,
    max_orphans: usize,
    ttl: Duration,
}

impl OrphanManage {
    pub fn new(max_orphans: usize, ttl: Duration) -> Self {
        Self {
            orphans: HashMap::new(),
            prev_orphans: HashMap::new(),
            max_orphans: max_orphans.max(1),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }

    pub fn block_exist(&self, hash: &Hash) -> bool {
        self.orphans.contains_key(hash)
    }

    /// Buffer `block`. Known blocks are ignored.
    pub fn add(&mut self, block: Block) {
        self.add_at(block, Instant::now());
    }

    fn add_at(&mut self, block: Block, now: Instant) {
        let hash = block.hash();
        if self.orphans.contains_key(&hash) {
            return;
        }
        if self.orphans.len() >= self.max_orphans {
            self.evict_oldest();
        }

        let prev = block.previous_hash();
        debug!(
            hash = %hash_hex(&hash),
            height = block.height(),
            prev = %hash_hex(&prev),
            "Orphan block added"
        );
        self.orphans.insert(
            hash,
            OrphanBlock {
                block,
                expiration: now + self.ttl,
            },
        );
        self.prev_orphans.entry(prev).or_default().push(hash);
    }

    pub fn get(&self, hash: &Hash) -> Option<&Block> {
        self.orphans.get(hash).map(|orphan| &orphan.block)
    }

    /// Hashes of orphans whose parent is `prev_hash`, in arrival order.
    pub fn get_prev_orphans(&self, prev_hash: &Hash) -> Vec<Hash> {
        self.prev_orphans.get(prev_hash).cloned().unwrap_or_default()
    }

    pub fn delete(&mut self, hash: &Hash) {
        let Some(orphan) = self.orphans.remove(hash) else {
            return;
        };
        let prev = orphan.block.previous_hash();
        if let Some(children) = self.prev_orphans.get_mut(&prev) {
            children.retain(|child| child != hash);
            if children.is_empty() {
                self.prev_orphans.remove(&prev);
            }
        }
    }

    /// Drop every orphan whose TTL elapsed before `now`.
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired: Vec<Hash> = self
            .orphans
            .iter()
            .filter(|(_, orphan)| orphan.expiration < now)
            .map(|(hash, _)| *hash)
            .collect();
        for hash in &expired {
            self.delete(hash);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired orphan blocks");
        }
        expired.len()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .orphans
            .iter()
            .min_by_key(|(_, orphan)| orphan.expiration)
            .map(|(hash, _)| *hash);
        if let Some(hash) = oldest {
            debug!(hash = %hash_hex(&hash), "Orphan pool full, evicting oldest");
            self.delete(&hash);
        }
    }
}
