//! # Chain Controller
//!
//! Owns the best block. Blocks enter through one worker task that buffers
//! orphans, validates and stores blocks, extends the main chain, and follows
//! Casper's fork choice across reorganizations.
//!
//! ## Processing a block
//!
//! | Situation | Outcome |
//! |---|---|
//! | Already known at or below the best height | Reports whether it is an orphan |
//! | Parent unknown | Buffered in the orphan pool, `Ok(true)` |
//! | Extends the best block | `connect_block`: view, Casper, commit, pool cleanup |
//! | Anything else | Fed to Casper; a new preferred tip triggers a reorg |
//!
//! After every commit, orphans waiting on the new best block are retried.
//!
//! ## Transactions
//!
//! [`Chain::validate_tx`] runs the [`BlockValidator`] against the best
//! header, checks spends against the persisted UTXO set and admits the
//! transaction to the pool. Rejected ids go to the pool's error cache.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod genesis;
pub mod ports;
pub mod service;

pub use adapters::{Sha3Pow, StructuralValidator};
pub use config::ChainConfig;
pub use domain::OrphanManage;
pub use error::{ChainError, ChainResult, ValidationError};
pub use genesis::init_chain_status;
pub use ports::{BlockValidator, ChainQueries, ChainStore, PowOracle, TxValidation};
pub use service::Chain;
