//! # Transaction Pool
//!
//! Buffers transactions that passed validation but are not yet in a block,
//! plus a bounded cache of ids known to be invalid.
//!
//! ```text
//! network ──validate_tx──► TxPool::add_transaction ──► LedgerEvent::NewTransaction
//! chain worker ──────────► remove_transaction (confirmed)
//!                          add_transaction     (restored by a reorg)
//! ```
//!
//! `fee_per_kb` is fixed at admission and is what block assembly ranks by.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{MempoolConfig, MempoolError, MempoolResult, Timestamp, TxDesc};
pub use ports::{SystemTimeSource, TimeSource};
pub use service::TxPool;
