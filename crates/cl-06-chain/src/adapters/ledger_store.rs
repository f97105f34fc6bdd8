//! [`ChainStore`] over the persisted [`LedgerStore`].

use cl_01_entry_graph::Block;
use cl_02_state_viewpoints::{ContractViewpoint, UtxoEntry, UtxoViewpoint};
use cl_04_block_storage::{ChainStatus, KeyValueStore, LedgerStore};
use shared_types::{BlockHeader, Hash, StorageError};

use crate::ports::ChainStore;

impl<K: KeyValueStore> ChainStore for LedgerStore<K> {
    fn block_exist(&self, hash: &Hash) -> Result<bool, StorageError> {
        LedgerStore::block_exist(self, hash)
    }

    fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        LedgerStore::save_block(self, block)
    }

    fn get_main_chain_hash(&self, height: u64) -> Result<Hash, StorageError> {
        LedgerStore::get_main_chain_hash(self, height)
    }

    fn get_utxo(&self, id: &Hash) -> Result<Option<UtxoEntry>, StorageError> {
        LedgerStore::get_utxo(self, id)
    }

    fn get_chain_status(&self) -> Result<Option<ChainStatus>, StorageError> {
        LedgerStore::get_chain_status(self)
    }

    fn save_chain_status(
        &self,
        header: &BlockHeader,
        utxo_view: &UtxoViewpoint,
        contract_view: &ContractViewpoint,
    ) -> Result<(), StorageError> {
        LedgerStore::save_chain_status(self, header, utxo_view, contract_view)
    }
}
