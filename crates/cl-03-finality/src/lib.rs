//! # Casper Finality Gadget
//!
//! BFT finality overlay for the proof-of-work chain. Checkpoints sit at
//! every `blocks_of_epoch` heights; validators vote from a justified source
//! checkpoint to a target, and a two-thirds stake majority justifies the
//! target. A justified checkpoint followed directly by a justified child is
//! finalized and becomes the new root of the in-memory tree.
//!
//! ## Status progression
//!
//! ```text
//! Growing ──► Unjustified ──► Justified ──► Finalized
//! ```
//!
//! ## Slashing
//!
//! A validator may not vote twice for the same target height, nor vote a
//! span that surrounds (or is surrounded by) one of its other votes.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::CasperConfig;
pub use domain::{Checkpoint, CheckpointStatus, SupLink, Validator, Verification};
pub use error::{FinalityError, FinalityResult};
pub use ports::CheckpointStore;
pub use service::{ApplyBlockReply, Casper, RollbackMsg};
