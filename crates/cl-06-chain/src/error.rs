//! Error types for the chain controller.

use cl_01_entry_graph::EntryError;
use cl_02_state_viewpoints::StateError;
use cl_03_finality::FinalityError;
use cl_05_mempool::MempoolError;
use shared_crypto::CryptoError;
use shared_types::StorageError;
use thiserror::Error;

/// Why a block or transaction was rejected by the validation oracle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Block height {found} does not follow parent height, expected {expected}")]
    MisorderedHeight { expected: u64, found: u64 },

    #[error("Previous block hash does not match the parent")]
    MismatchedPrevHash,

    #[error("Block timestamp {timestamp} is not after parent timestamp {parent}")]
    TimestampNotIncreasing { timestamp: u64, parent: u64 },

    #[error("Block timestamp {timestamp} is before checkpoint timestamp {checkpoint}")]
    TimestampBeforeCheckpoint { timestamp: u64, checkpoint: u64 },

    #[error("Transactions merkle root mismatch")]
    MismatchedMerkleRoot,

    #[error("First transaction is not a coinbase")]
    MissingCoinbase,

    #[error("Coinbase transaction at position {0}")]
    MisplacedCoinbase(usize),

    #[error("Transaction status has {found} flags for {expected} transactions")]
    MismatchedStatusLength { expected: usize, found: usize },

    #[error("Proof of work does not meet target")]
    BadWork,

    #[error("Transaction {index} is poorly formed: {source}")]
    PoorlyFormed { index: usize, source: EntryError },

    #[error("Coinbase transactions are only valid inside a block")]
    CoinbaseTransaction,

    #[error("Transaction time range [{min_time}, {max_time}] excludes {timestamp}")]
    TimeRange {
        min_time: u64,
        max_time: u64,
        timestamp: u64,
    },

    #[error("Native outputs {output} exceed native inputs {input}")]
    InsufficientFee { input: u64, output: u64 },

    #[error("Amount overflow")]
    Overflow,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid block: {0}")]
    BadBlock(#[from] ValidationError),

    #[error("Invalid block signature: {0}")]
    InvalidBlockSignature(#[from] CryptoError),

    #[error("Block timestamp {timestamp} is before the first proposer slot {start}")]
    TimestampBeforeSlot { timestamp: u64, start: u64 },

    #[error("No validators for checkpoint {0}")]
    NoValidators(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Finality error: {0}")]
    Finality(#[from] FinalityError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Fork chain is empty")]
    EmptyForkChain,

    #[error("Transaction {0} is in the error cache")]
    TxInErrCache(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(ValidationError),

    #[error("Transaction pool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("Chain worker stopped")]
    WorkerStopped,

    #[error("No chain status in the store")]
    NotInitialized,
}

pub type ChainResult<T> = Result<T, ChainError>;
