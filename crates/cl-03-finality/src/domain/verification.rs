//! Finality votes.

use serde::{Deserialize, Serialize};
use shared_crypto::{verify_signature, CryptoError, Ed25519KeyPair};
use shared_types::{Hash, HashWriter, PublicKey};

/// A validator's vote linking a justified source checkpoint to a target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub source_height: u64,
    pub source_hash: Hash,
    pub target_height: u64,
    pub target_hash: Hash,
    pub pub_key: PublicKey,
    pub signature: Vec<u8>,
}

impl Verification {
    /// Unsigned vote.
    pub fn new(source: (u64, Hash), target: (u64, Hash), pub_key: PublicKey) -> Self {
        Self {
            source_height: source.0,
            source_hash: source.1,
            target_height: target.0,
            target_hash: target.1,
            pub_key,
            signature: Vec::new(),
        }
    }

    /// The signed message: SHA3 over both heights and hashes.
    pub fn message(&self) -> Hash {
        let mut w = HashWriter::new();
        w.write(&self.source_height)
            .write(&self.source_hash)
            .write(&self.target_height)
            .write(&self.target_hash);
        w.finish()
    }

    pub fn sign(&mut self, key: &Ed25519KeyPair) {
        self.signature = key.sign(&self.message()).to_vec();
    }

    pub fn verify_signature(&self) -> Result<(), CryptoError> {
        verify_signature(&self.pub_key, &self.message(), &self.signature)
    }
}
