//! # Domain Errors
//!
//! Backend and codec failures. Both collapse into the shared
//! [`StorageError`] at the store boundary so callers see one error type.

use shared_types::StorageError;
use thiserror::Error;

/// Key-value backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

impl From<KVStoreError> for StorageError {
    fn from(err: KVStoreError) -> Self {
        match err {
            KVStoreError::CorruptionError { message } => StorageError::DataCorruption(message),
            other => StorageError::DatabaseError(other.to_string()),
        }
    }
}

/// Encoding or decoding a stored value failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Serialization error: {message}")]
pub struct SerializationError {
    pub message: String,
}

impl From<SerializationError> for StorageError {
    fn from(err: SerializationError) -> Self {
        StorageError::DataCorruption(err.message)
    }
}
