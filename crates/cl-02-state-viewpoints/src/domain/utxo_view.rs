//! # UTXO Viewpoint
//!
//! A staged overlay of the unspent-output set. Entries are loaded from the
//! store on demand, mutated by apply/detach, and written back in one batch.
//!
//! Spent entries stay in the view (and the store) so that detaching a block
//! restores the spent output with its original height. Outputs removed by a
//! detach are tracked as deletion markers.

use std::collections::{HashMap, HashSet};

use cl_01_entry_graph::{Block, Entry, Tx};
use shared_types::{hash_hex, Hash};
use tracing::debug;

use super::errors::{StateError, StateResult};
use super::utxo_entry::UtxoEntry;

#[derive(Debug, Clone, Default)]
pub struct UtxoViewpoint {
    entries: HashMap<Hash, UtxoEntry>,
    deleted: HashSet<Hash>,
}

impl PartialEq for UtxoViewpoint {
    /// Views are equal when they describe the same live entries.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for UtxoViewpoint {}

impl UtxoViewpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Hash) -> Option<&UtxoEntry> {
        self.entries.get(id)
    }

    /// Stage an entry, typically one loaded from the store.
    pub fn insert(&mut self, id: Hash, entry: UtxoEntry) {
        self.deleted.remove(&id);
        self.entries.insert(id, entry);
    }

    pub fn has_utxo(&self, id: &Hash) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether the view already decides `id`, live or deleted. Stores must
    /// not load staged ids over the view.
    pub fn is_staged(&self, id: &Hash) -> bool {
        self.entries.contains_key(id) || self.deleted.contains(id)
    }

    pub fn can_spend(&self, id: &Hash) -> bool {
        self.entries.get(id).is_some_and(|e| !e.spent)
    }

    /// Staged live entries, spent ones included.
    pub fn entries(&self) -> &HashMap<Hash, UtxoEntry> {
        &self.entries
    }

    /// Ids to delete from the store on commit.
    pub fn deleted(&self) -> &HashSet<Hash> {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.deleted.is_empty()
    }

    pub fn apply_block(&mut self, block: &Block) -> StateResult<()> {
        let height = block.height();
        for (i, tx) in block.transactions.iter().enumerate() {
            let is_coinbase = i == 0 && tx.is_coinbase();
            self.apply_tx(height, tx, is_coinbase, block.header.status_fail(i))?;
        }
        debug!(
            height,
            hash = %hash_hex(&block.hash()),
            staged = self.entries.len(),
            "Applied block to utxo view"
        );
        Ok(())
    }

    /// Spend `tx`'s inputs and stage its outputs at `height`.
    ///
    /// A gas-only (`status_fail`) transaction keeps only its native effects.
    /// A transaction applied on its own never occupies a block's coinbase
    /// slot, so its outputs are staged without coinbase maturity.
    pub fn apply_transaction(&mut self, height: u64, tx: &Tx, status_fail: bool) -> StateResult<()> {
        self.apply_tx(height, tx, false, status_fail)
    }

    fn apply_tx(
        &mut self,
        height: u64,
        tx: &Tx,
        is_coinbase: bool,
        status_fail: bool,
    ) -> StateResult<()> {
        let mapped = tx.mapped();
        for spent_id in &mapped.spent_output_ids {
            let spent = mapped.output(spent_id)?;
            if status_fail && !spent.source.value.is_native() {
                continue;
            }

            let entry = self
                .entries
                .get_mut(spent_id)
                .ok_or_else(|| StateError::UtxoNotFound(hash_hex(spent_id)))?;
            if entry.spent {
                return Err(StateError::DoubleSpend(hash_hex(spent_id)));
            }
            if !entry.is_mature_at(height) {
                return Err(StateError::ImmatureCoinbase {
                    id: hash_hex(spent_id),
                    block_height: entry.block_height,
                    height,
                });
            }
            entry.spend_output();
        }

        for (id, result) in mapped.results() {
            let Some(Entry::Output(output)) = result else {
                continue;
            };
            if status_fail && !output.source.value.is_native() {
                continue;
            }
            self.insert(*id, UtxoEntry::new(is_coinbase, height, false));
        }
        Ok(())
    }

    pub fn detach_block(&mut self, block: &Block) -> StateResult<()> {
        for (i, tx) in block.transactions.iter().enumerate().rev() {
            self.detach_transaction(tx, block.header.status_fail(i))?;
        }
        debug!(
            height = block.height(),
            hash = %hash_hex(&block.hash()),
            "Detached block from utxo view"
        );
        Ok(())
    }

    /// Exact inverse of [`apply_transaction`](Self::apply_transaction).
    pub fn detach_transaction(&mut self, tx: &Tx, status_fail: bool) -> StateResult<()> {
        let mapped = tx.mapped();
        for spent_id in &mapped.spent_output_ids {
            let spent = mapped.output(spent_id)?;
            if status_fail && !spent.source.value.is_native() {
                continue;
            }

            let entry = self
                .entries
                .get_mut(spent_id)
                .ok_or_else(|| StateError::UtxoNotFound(hash_hex(spent_id)))?;
            if !entry.spent {
                return Err(StateError::UtxoNotSpent(hash_hex(spent_id)));
            }
            entry.unspend_output();
        }

        for (id, result) in mapped.results() {
            let Some(Entry::Output(output)) = result else {
                continue;
            };
            if status_fail && !output.source.value.is_native() {
                continue;
            }
            self.entries.remove(id);
            self.deleted.insert(*id);
        }
        Ok(())
    }
}
