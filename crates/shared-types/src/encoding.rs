//! # Canonical Hash Encoding
//!
//! Fixed-width little-endian integers, raw 32-byte hashes and
//! length-prefixed byte strings. Content-addressed ids are computed over this
//! encoding and nothing else.

use sha3::{Digest, Sha3_256};

use crate::entities::Hash;

/// Streaming SHA3-256 writer for canonical encodings.
#[derive(Clone, Default)]
pub struct HashWriter {
    hasher: Sha3_256,
}

impl HashWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self
    }

    /// Append any value with a canonical encoding.
    pub fn write<T: ForHash + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.write_for_hash(self);
        self
    }

    /// Append a count-prefixed sequence.
    pub fn write_list<T: ForHash>(&mut self, items: &[T]) -> &mut Self {
        (items.len() as u64).write_for_hash(self);
        for item in items {
            item.write_for_hash(self);
        }
        self
    }

    pub fn finish(self) -> Hash {
        self.hasher.finalize().into()
    }
}

/// Types that contribute to a content hash.
pub trait ForHash {
    fn write_for_hash(&self, w: &mut HashWriter);
}

impl ForHash for u64 {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write_raw(&self.to_le_bytes());
    }
}

impl ForHash for bool {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write_raw(&[u8::from(*self)]);
    }
}

impl ForHash for Hash {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write_raw(self);
    }
}

impl ForHash for [u8] {
    fn write_for_hash(&self, w: &mut HashWriter) {
        (self.len() as u64).write_for_hash(w);
        w.write_raw(self);
    }
}

impl ForHash for Vec<u8> {
    fn write_for_hash(&self, w: &mut HashWriter) {
        self.as_slice().write_for_hash(w);
    }
}

impl ForHash for str {
    fn write_for_hash(&self, w: &mut HashWriter) {
        self.as_bytes().write_for_hash(w);
    }
}

impl ForHash for [Hash] {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write_list(self);
    }
}

impl<T: ForHash> ForHash for Option<T> {
    fn write_for_hash(&self, w: &mut HashWriter) {
        match self {
            Some(value) => {
                true.write_for_hash(w);
                value.write_for_hash(w);
            }
            None => false.write_for_hash(w),
        }
    }
}

/// One-shot SHA3-256.
pub fn sha3_256(data: &[u8]) -> Hash {
    Sha3_256::digest(data).into()
}
