//! Key layout. Every key is a two-byte namespace followed by its suffix.
//! Heights are big-endian so prefix scans come back height-ordered on
//! sorted backends.

use shared_types::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// `B:{hash}` -> Block
    Block,
    /// `H:{hash}` -> BlockHeader
    Header,
    /// `M:{height}` -> main-chain Hash
    MainChain,
    /// `U:{output id}` -> UtxoEntry
    Utxo,
    /// `C:{height}{hash}` -> Checkpoint
    Checkpoint,
    /// `R:{sha3(program)}` -> txid || program
    Contract,
    /// `S:status` -> ChainStatus
    Status,
}

impl KeyPrefix {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Block => b"B:",
            KeyPrefix::Header => b"H:",
            KeyPrefix::MainChain => b"M:",
            KeyPrefix::Utxo => b"U:",
            KeyPrefix::Checkpoint => b"C:",
            KeyPrefix::Contract => b"R:",
            KeyPrefix::Status => b"S:",
        }
    }

    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    pub fn block_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Block.key(hash)
    }

    pub fn header_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Header.key(hash)
    }

    pub fn main_chain_key(height: u64) -> Vec<u8> {
        KeyPrefix::MainChain.key(&height.to_be_bytes())
    }

    pub fn utxo_key(id: &Hash) -> Vec<u8> {
        KeyPrefix::Utxo.key(id)
    }

    pub fn checkpoint_key(height: u64, hash: &Hash) -> Vec<u8> {
        let mut key = KeyPrefix::Checkpoint.key(&height.to_be_bytes());
        key.extend_from_slice(hash);
        key
    }

    pub fn contract_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Contract.key(hash)
    }

    pub fn status_key() -> Vec<u8> {
        KeyPrefix::Status.key(b"status")
    }
}
