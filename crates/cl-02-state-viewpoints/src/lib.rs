//! # State Viewpoints
//!
//! Staged views of ledger state that a block can be applied to or detached
//! from without touching the store:
//!
//! - [`UtxoViewpoint`]: spent/unspent status and creation height per output.
//! - [`ContractViewpoint`]: contract registrations attached or detached.
//!
//! The chain controller loads a view through [`UtxoStore`], mutates it, and
//! commits it together with the new best header in one atomic batch.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryUtxoStore;
pub use domain::*;
pub use ports::UtxoStore;
