//! Dependencies of the finality gadget.

use cl_01_entry_graph::Block;
use shared_types::{BlockHeader, Hash, StorageError};

use crate::domain::Checkpoint;

/// Persisted blocks and checkpoints.
pub trait CheckpointStore: Send + Sync {
    fn get_block_header(&self, hash: &Hash) -> Result<BlockHeader, StorageError>;

    fn get_block(&self, hash: &Hash) -> Result<Block, StorageError>;

    fn get_checkpoint(&self, hash: &Hash) -> Result<Checkpoint, StorageError>;

    fn save_checkpoints(&self, checkpoints: &[Checkpoint]) -> Result<(), StorageError>;

    /// The last finalized checkpoint (or genesis) first, then every stored
    /// checkpoint above it in height order.
    fn load_checkpoints(&self) -> Result<Vec<Checkpoint>, StorageError>;
}
