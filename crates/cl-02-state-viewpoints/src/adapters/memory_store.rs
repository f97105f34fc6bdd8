//! In-memory UTXO store for tests and light tooling.

use std::collections::HashMap;

use cl_01_entry_graph::Tx;
use parking_lot::RwLock;
use shared_types::{Hash, StorageError};

use crate::domain::{UtxoEntry, UtxoViewpoint};
use crate::ports::UtxoStore;

#[derive(Debug, Default)]
pub struct InMemoryUtxoStore {
    entries: RwLock<HashMap<Hash, UtxoEntry>>,
}

impl InMemoryUtxoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Hash) -> Option<UtxoEntry> {
        self.entries.read().get(id).copied()
    }

    pub fn insert(&self, id: Hash, entry: UtxoEntry) {
        self.entries.write().insert(id, entry);
    }

    /// Write a staged view back.
    pub fn commit(&self, view: &UtxoViewpoint) {
        let mut entries = self.entries.write();
        for id in view.deleted() {
            entries.remove(id);
        }
        for (id, entry) in view.entries() {
            entries.insert(*id, *entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl UtxoStore for InMemoryUtxoStore {
    fn get_transactions_utxo(
        &self,
        view: &mut UtxoViewpoint,
        txs: &[Tx],
    ) -> Result<(), StorageError> {
        let entries = self.entries.read();
        for tx in txs {
            for id in &tx.mapped().spent_output_ids {
                if view.is_staged(id) {
                    continue;
                }
                if let Some(entry) = entries.get(id) {
                    view.insert(*id, *entry);
                }
            }
        }
        Ok(())
    }
}
