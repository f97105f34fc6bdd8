//! # Outbound Ports (Driven Ports)
//!
//! What the chain controller needs from storage and from block validation.

use cl_01_entry_graph::{Block, Tx};
use cl_02_state_viewpoints::{ContractViewpoint, UtxoEntry, UtxoStore, UtxoViewpoint};
use cl_03_finality::{Checkpoint, CheckpointStore};
use cl_04_block_storage::ChainStatus;
use shared_types::{BlockHeader, Hash, StorageError};

use crate::error::ValidationError;

/// Persistent chain state.
pub trait ChainStore: CheckpointStore + UtxoStore {
    fn block_exist(&self, hash: &Hash) -> Result<bool, StorageError>;

    fn save_block(&self, block: &Block) -> Result<(), StorageError>;

    fn get_main_chain_hash(&self, height: u64) -> Result<Hash, StorageError>;

    fn get_utxo(&self, id: &Hash) -> Result<Option<UtxoEntry>, StorageError>;

    /// `None` before genesis has been written.
    fn get_chain_status(&self) -> Result<Option<ChainStatus>, StorageError>;

    /// Commit both views and move the best block to `header` in one
    /// atomic write.
    fn save_chain_status(
        &self,
        header: &BlockHeader,
        utxo_view: &UtxoViewpoint,
        contract_view: &ContractViewpoint,
    ) -> Result<(), StorageError>;
}

/// Outcome of validating a loose transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxValidation {
    /// Only the fee is charged; outputs are not created.
    pub gas_only: bool,
    /// Native fee paid.
    pub fee: u64,
}

/// Consensus rules for blocks and loose transactions.
pub trait BlockValidator: Send + Sync {
    fn validate_block(
        &self,
        block: &Block,
        parent: &BlockHeader,
        checkpoint: &Checkpoint,
    ) -> Result<(), ValidationError>;

    /// Validate `tx` for inclusion in the block after `parent`.
    fn validate_tx(&self, tx: &Tx, parent: &BlockHeader) -> Result<TxValidation, ValidationError>;
}

/// Proof-of-work hash for a header hash and seed.
pub trait PowOracle: Send + Sync {
    fn pow_hash(&self, header_hash: &Hash, seed: &Hash) -> Hash;
}
