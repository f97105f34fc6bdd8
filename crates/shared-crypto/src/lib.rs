//! # Shared Crypto
//!
//! Ed25519 signing for the two signed artifacts of the ledger:
//!
//! | Artifact | Signer | Message |
//! |----------|--------|---------|
//! | Block witness | Proposer selected for the time slot | Block header hash |
//! | Finality vote | Casper validator | SHA3 of source/target heights and hashes |
//!
//! Hashing lives in `shared-types` next to the canonical encoding.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use signatures::{verify_signature, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
