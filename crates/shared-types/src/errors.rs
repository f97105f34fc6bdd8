//! # Error Types
//!
//! Storage errors shared by every store port.

use thiserror::Error;

/// Errors raised by the persisted store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored bytes could not be decoded.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// Backend read or write failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
