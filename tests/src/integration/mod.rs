//! Cross-crate scenarios.

pub mod support;

mod finality;
mod mempool;
mod orphans;
mod reorg_pool;
