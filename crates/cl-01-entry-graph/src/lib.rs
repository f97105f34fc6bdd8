//! # Entry Graph
//!
//! Maps a flat transaction into a content-addressed graph of entries. The
//! graph gives every input, output and anchor a stable id, which is what
//! double-spend and anchor-reuse detection work on.
//!
//! ```text
//! TxData ──► map_tx ──► MappedTx { id, header, entries, input_ids,
//!                                  nonce_ids, spent_output_ids }
//! ```
//!
//! Mapping never fails. Inputs it cannot resolve are recorded as
//! `ZERO_HASH` and reported by [`MappedTx::check_well_formed`].

pub mod domain;
pub mod types;

pub use domain::{
    map_tx, merkle_root, program, Entry, EntryError, EntryResult, MappedTx, Output, Retirement,
    Spend,
};
pub use types::{Block, Tx};
