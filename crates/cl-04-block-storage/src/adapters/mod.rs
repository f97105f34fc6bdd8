//! Storage adapters.

pub mod codec;
mod memory;

pub use memory::InMemoryKVStore;
