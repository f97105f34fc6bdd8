//! # Ledger Storage
//!
//! Persistence for the ledger core over an abstract key-value backend.
//!
//! ```text
//! Chain controller ──► LedgerStore<K> ──► KeyValueStore (K)
//!  Casper          ──►      │                 └─ InMemoryKVStore
//!  UTXO loading    ──►      └─ header/block LRU caches
//! ```
//!
//! | Prefix | Record |
//! |--------|--------|
//! | `B:` | block |
//! | `H:` | header |
//! | `M:` | main-chain height -> hash |
//! | `U:` | UTXO entry |
//! | `C:` | checkpoint |
//! | `R:` | contract registration |
//! | `S:` | chain status |
//!
//! Values are bincode-encoded.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod store;

pub use adapters::InMemoryKVStore;
pub use domain::{ChainStatus, KVStoreError, KeyPrefix, SerializationError, StorageConfig};
pub use ports::{BatchOperation, KeyValueStore};
pub use store::LedgerStore;
