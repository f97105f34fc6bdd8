//! Error types for the finality gadget.

use shared_crypto::CryptoError;
use shared_types::StorageError;
use thiserror::Error;

use crate::domain::CheckpointStatus;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FinalityError {
    /// The first loaded checkpoint must be genesis or finalized.
    #[error("Initial checkpoint at height {height} is {status:?}, expected genesis or finalized")]
    InvalidInitialCheckpoint {
        height: u64,
        status: CheckpointStatus,
    },

    #[error("No checkpoints to start from")]
    NoCheckpoints,

    #[error("Checkpoint not found for block {0}")]
    CheckpointNotFound(String),

    #[error("Public key {0} is not a validator of the target checkpoint")]
    NotValidator(String),

    #[error("Verification targets a growing checkpoint")]
    VoteToGrowingCheckpoint,

    #[error("Source height {source_height} is not below target height {target_height}")]
    VoteToSameCheckpoint {
        source_height: u64,
        target_height: u64,
    },

    #[error("Invalid verification signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    /// Two distinct votes for the same target height.
    #[error("Validator {0} published two distinct votes for the same target height")]
    SameHeightInVerification(String),

    /// A vote inside (or around) the span of another vote by the same key.
    #[error("Validator {0} published a vote within the span of its other votes")]
    SpanHeightInVerification(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type FinalityResult<T> = Result<T, FinalityError>;
