//! Store domain: key layout, persisted records, errors.

pub mod chain_status;
pub mod config;
pub mod errors;
pub mod keys;

pub use chain_status::ChainStatus;
pub use config::StorageConfig;
pub use errors::{KVStoreError, SerializationError};
pub use keys::KeyPrefix;
