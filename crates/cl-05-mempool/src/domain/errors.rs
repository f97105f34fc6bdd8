//! Mempool error types.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    /// Pool is at capacity and the transaction does not outbid the cheapest
    /// entry.
    #[error("Pool full ({capacity} transactions), fee per kb {fee_per_kb} too low")]
    PoolFull { capacity: usize, fee_per_kb: u64 },
}

pub type MempoolResult<T> = Result<T, MempoolError>;
