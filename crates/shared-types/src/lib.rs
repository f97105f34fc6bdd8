//! # Shared Types Crate
//!
//! Ledger primitives shared by every subsystem of the node.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the flat transaction, block header and hash
//!   aliases are defined once here and reused by the entry graph, state
//!   viewpoints, finality gadget and chain controller.
//! - **Canonical Encoding**: every hashed structure is written through
//!   [`encoding::ForHash`], so identical content always yields identical ids.

pub mod encoding;
pub mod entities;
pub mod errors;

pub use encoding::{sha3_256, ForHash, HashWriter};
pub use entities::*;
pub use errors::*;
