pub mod entities;
pub mod errors;
pub mod pool;

pub use entities::{MempoolConfig, Timestamp, TxDesc};
pub use errors::{MempoolError, MempoolResult};
pub use pool::PoolIndex;
