//! # Ledger Store
//!
//! Every persisted record of the core over one [`KeyValueStore`]: blocks,
//! headers, the main-chain index, UTXOs, contracts, checkpoints and the
//! chain status. Implements the finality and state store ports here; the
//! chain controller adapts it to its own port.
//!
//! `save_chain_status` is the commit point of a block or reorg. It writes the
//! staged views, the main-chain index and the new status in one batch.

use std::num::NonZeroUsize;

use cl_01_entry_graph::{Block, Tx};
use cl_02_state_viewpoints::{ContractViewpoint, UtxoEntry, UtxoStore, UtxoViewpoint};
use cl_03_finality::{Checkpoint, CheckpointStatus, CheckpointStore};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use shared_types::{hash_hex, BlockHeader, Hash, StorageError};
use tracing::debug;

use crate::adapters::codec::{decode, encode};
use crate::domain::{ChainStatus, KeyPrefix, StorageConfig};
use crate::ports::{BatchOperation, KeyValueStore};

pub struct LedgerStore<K: KeyValueStore> {
    kv: RwLock<K>,
    header_cache: Mutex<LruCache<Hash, BlockHeader>>,
    block_cache: Mutex<LruCache<Hash, Block>>,
}

impl<K: KeyValueStore> LedgerStore<K> {
    pub fn new(kv: K, config: StorageConfig) -> Self {
        let size = NonZeroUsize::new(config.cached_blocks).unwrap_or(NonZeroUsize::MIN);
        Self {
            kv: RwLock::new(kv),
            header_cache: Mutex::new(LruCache::new(size)),
            block_cache: Mutex::new(LruCache::new(size)),
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StorageError> {
        match self.kv.read().get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    pub fn block_exist(&self, hash: &Hash) -> Result<bool, StorageError> {
        if self.header_cache.lock().contains(hash) {
            return Ok(true);
        }
        Ok(self.kv.read().exists(&KeyPrefix::header_key(hash))?)
    }

    /// Store a block and its header. Does not touch the main chain.
    pub fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        let hash = block.hash();
        let ops = vec![
            BatchOperation::put(KeyPrefix::block_key(&hash), encode(block)?),
            BatchOperation::put(KeyPrefix::header_key(&hash), encode(&block.header)?),
        ];
        self.kv.write().atomic_batch_write(ops)?;
        debug!(height = block.height(), hash = %hash_hex(&hash), "Block saved");
        Ok(())
    }

    pub fn get_block_header(&self, hash: &Hash) -> Result<BlockHeader, StorageError> {
        if let Some(header) = self.header_cache.lock().get(hash) {
            return Ok(header.clone());
        }
        let header: BlockHeader = self
            .read(&KeyPrefix::header_key(hash))?
            .ok_or_else(|| StorageError::NotFound(format!("header {}", hash_hex(hash))))?;
        self.header_cache.lock().put(*hash, header.clone());
        Ok(header)
    }

    pub fn get_block(&self, hash: &Hash) -> Result<Block, StorageError> {
        if let Some(block) = self.block_cache.lock().get(hash) {
            return Ok(block.clone());
        }
        let block: Block = self
            .read(&KeyPrefix::block_key(hash))?
            .ok_or_else(|| StorageError::NotFound(format!("block {}", hash_hex(hash))))?;
        self.block_cache.lock().put(*hash, block.clone());
        Ok(block)
    }

    // =========================================================================
    // MAIN CHAIN
    // =========================================================================

    pub fn get_main_chain_hash(&self, height: u64) -> Result<Hash, StorageError> {
        self.read(&KeyPrefix::main_chain_key(height))?
            .ok_or_else(|| StorageError::NotFound(format!("main chain height {height}")))
    }

    /// `None` until the chain has been initialised.
    pub fn get_chain_status(&self) -> Result<Option<ChainStatus>, StorageError> {
        self.read(&KeyPrefix::status_key())
    }

    /// Commit a new best block with the staged views.
    ///
    /// Main-chain entries above the new tip are dropped and entries from the
    /// tip down to the fork point are rewritten.
    pub fn save_chain_status(
        &self,
        header: &BlockHeader,
        utxo_view: &UtxoViewpoint,
        contract_view: &ContractViewpoint,
    ) -> Result<(), StorageError> {
        let mut ops = Vec::new();

        for id in utxo_view.deleted() {
            ops.push(BatchOperation::delete(KeyPrefix::utxo_key(id)));
        }
        for (id, entry) in utxo_view.entries() {
            ops.push(BatchOperation::put(KeyPrefix::utxo_key(id), encode(entry)?));
        }

        // Detach first: a reorg may drop and re-add the same registration.
        for hash in contract_view.detach_entries.keys() {
            ops.push(BatchOperation::delete(KeyPrefix::contract_key(hash)));
        }
        for (hash, value) in &contract_view.attach_entries {
            ops.push(BatchOperation::put(KeyPrefix::contract_key(hash), value.clone()));
        }

        if let Some(old) = self.get_chain_status()? {
            for height in header.height + 1..=old.height {
                ops.push(BatchOperation::delete(KeyPrefix::main_chain_key(height)));
            }
        }
        ops.extend(self.main_chain_ops(header)?);

        let status = ChainStatus {
            height: header.height,
            hash: header.hash(),
        };
        ops.push(BatchOperation::put(KeyPrefix::status_key(), encode(&status)?));

        let count = ops.len();
        self.kv.write().atomic_batch_write(ops)?;
        debug!(
            height = status.height,
            hash = %hash_hex(&status.hash),
            operations = count,
            "Chain status committed"
        );
        Ok(())
    }

    fn main_chain_ops(&self, tip: &BlockHeader) -> Result<Vec<BatchOperation>, StorageError> {
        let mut ops = Vec::new();
        let mut cursor = tip.clone();
        loop {
            ops.push(BatchOperation::put(
                KeyPrefix::main_chain_key(cursor.height),
                encode(&cursor.hash())?,
            ));
            if cursor.height == 0 {
                return Ok(ops);
            }
            match self.get_main_chain_hash(cursor.height - 1) {
                Ok(hash) if hash == cursor.previous_block_hash => return Ok(ops),
                Ok(_) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
            cursor = self.get_block_header(&cursor.previous_block_hash)?;
        }
    }

    // =========================================================================
    // STATE
    // =========================================================================

    pub fn get_utxo(&self, id: &Hash) -> Result<Option<UtxoEntry>, StorageError> {
        self.read(&KeyPrefix::utxo_key(id))
    }

    /// `txid || program` of a registered contract.
    pub fn get_contract(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.kv.read().get(&KeyPrefix::contract_key(hash))?)
    }
}

impl<K: KeyValueStore> UtxoStore for LedgerStore<K> {
    fn get_transactions_utxo(
        &self,
        view: &mut UtxoViewpoint,
        txs: &[Tx],
    ) -> Result<(), StorageError> {
        for tx in txs {
            for id in &tx.mapped().spent_output_ids {
                if view.is_staged(id) {
                    continue;
                }
                if let Some(entry) = self.get_utxo(id)? {
                    view.insert(*id, entry);
                }
            }
        }
        Ok(())
    }
}

impl<K: KeyValueStore> CheckpointStore for LedgerStore<K> {
    fn get_block_header(&self, hash: &Hash) -> Result<BlockHeader, StorageError> {
        LedgerStore::get_block_header(self, hash)
    }

    fn get_block(&self, hash: &Hash) -> Result<Block, StorageError> {
        LedgerStore::get_block(self, hash)
    }

    fn get_checkpoint(&self, hash: &Hash) -> Result<Checkpoint, StorageError> {
        let header = LedgerStore::get_block_header(self, hash)?;
        self.read(&KeyPrefix::checkpoint_key(header.height, hash))?
            .ok_or_else(|| StorageError::NotFound(format!("checkpoint {}", hash_hex(hash))))
    }

    fn save_checkpoints(&self, checkpoints: &[Checkpoint]) -> Result<(), StorageError> {
        let ops = checkpoints
            .iter()
            .map(|cp| -> Result<BatchOperation, StorageError> {
                Ok(BatchOperation::put(
                    KeyPrefix::checkpoint_key(cp.height, &cp.hash),
                    encode(cp)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.kv.write().atomic_batch_write(ops)?;
        Ok(())
    }

    fn load_checkpoints(&self) -> Result<Vec<Checkpoint>, StorageError> {
        let scanned = self.kv.read().prefix_scan(KeyPrefix::Checkpoint.as_bytes())?;
        let mut all = scanned
            .iter()
            .map(|(_, bytes)| decode::<Checkpoint>(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        all.sort_by_key(|cp| cp.height);

        let root = all
            .iter()
            .rposition(|cp| cp.status == CheckpointStatus::Finalized)
            .or_else(|| all.iter().position(|cp| cp.height == 0));
        let Some(root) = root else {
            return Ok(Vec::new());
        };
        let root_height = all[root].height;
        let mut loaded = vec![all.swap_remove(root)];
        loaded.extend(all.into_iter().filter(|cp| cp.height > root_height));
        loaded[1..].sort_by_key(|cp| cp.height);
        Ok(loaded)
    }
}
