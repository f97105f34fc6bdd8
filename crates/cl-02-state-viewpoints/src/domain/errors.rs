use cl_01_entry_graph::EntryError;
use shared_types::StorageError;
use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Spent output {0} not found")]
    UtxoNotFound(String),

    #[error("Output {0} already spent")]
    DoubleSpend(String),

    #[error("Coinbase output {id} from height {block_height} spent at {height} before maturity")]
    ImmatureCoinbase {
        id: String,
        block_height: u64,
        height: u64,
    },

    #[error("Detaching output {0} that is not spent")]
    UtxoNotSpent(String),

    #[error("Entry graph error: {0}")]
    Entry(#[from] EntryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
