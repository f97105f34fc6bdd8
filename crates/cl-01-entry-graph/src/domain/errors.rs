//! Entry graph errors.

use thiserror::Error;

pub type EntryResult<T> = Result<T, EntryError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntryError {
    /// No entry with this id in the transaction.
    #[error("Missing entry {0}")]
    MissingEntry(String),

    /// The id resolves to an entry of another variant.
    #[error("Entry {id} is {found}, expected {expected}")]
    WrongEntryType {
        id: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Structural defect tolerated by the mapper and reported to validation.
    #[error("Poorly formed input {ordinal}: {reason}")]
    PoorlyFormed { ordinal: usize, reason: &'static str },
}
