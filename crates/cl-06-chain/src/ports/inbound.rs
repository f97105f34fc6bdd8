//! # Inbound Ports (Driving Ports)
//!
//! Read-side API of the chain controller. Every query answers from the
//! store and the best header without going through the worker queue.

use cl_01_entry_graph::Block;
use shared_types::{BlockHeader, Hash};

use crate::error::ChainResult;

pub trait ChainQueries {
    /// Whether the block is stored or waiting in the orphan pool.
    fn block_exist(&self, hash: &Hash) -> bool;

    /// ## Errors
    ///
    /// - `Storage`: the block is unknown or unreadable
    fn get_block_by_hash(&self, hash: &Hash) -> ChainResult<Block>;

    /// Main-chain block at `height`.
    ///
    /// ## Errors
    ///
    /// - `Storage`: no main-chain block at this height
    fn get_block_by_height(&self, height: u64) -> ChainResult<Block>;

    fn get_header_by_hash(&self, hash: &Hash) -> ChainResult<BlockHeader>;

    fn get_header_by_height(&self, height: u64) -> ChainResult<BlockHeader>;

    fn best_block_header(&self) -> BlockHeader;

    fn best_block_height(&self) -> u64;

    fn best_block_hash(&self) -> Hash;

    /// Whether `hash` is the main-chain block at its height.
    fn in_main_chain(&self, hash: &Hash) -> bool;
}
