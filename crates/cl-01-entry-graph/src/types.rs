//! Transaction and block wrappers carrying the mapped graph.

use serde::{Deserialize, Serialize};
use shared_types::{BlockHeader, Hash, TxData};

use crate::domain::{map_tx, merkle_root, MappedTx};

/// A flat transaction paired with its entry graph.
///
/// Serializes as the flat [`TxData`] only; decoding re-maps it, so the
/// graph can never disagree with the data it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TxData", into = "TxData")]
pub struct Tx {
    data: TxData,
    mapped: MappedTx,
}

impl Tx {
    pub fn new(data: TxData) -> Self {
        let mapped = map_tx(&data);
        Self { data, mapped }
    }

    /// Transaction id (the header entry id).
    pub fn id(&self) -> Hash {
        self.mapped.id
    }

    pub fn data(&self) -> &TxData {
        &self.data
    }

    pub fn mapped(&self) -> &MappedTx {
        &self.mapped
    }

    pub fn is_coinbase(&self) -> bool {
        self.data.is_coinbase()
    }
}

impl From<TxData> for Tx {
    fn from(data: TxData) -> Self {
        Self::new(data)
    }
}

impl From<Tx> for TxData {
    fn from(tx: Tx) -> Self {
        tx.data
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Tx>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Tx>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn previous_hash(&self) -> Hash {
        self.header.previous_block_hash
    }

    pub fn tx_ids(&self) -> Vec<Hash> {
        self.transactions.iter().map(Tx::id).collect()
    }

    /// Merkle root over the transaction ids.
    pub fn transactions_merkle_root(&self) -> Hash {
        merkle_root(&self.tx_ids())
    }

    /// Set the header's transaction root and size its status vector to
    /// the transaction list. Existing status flags are kept.
    pub fn commit_transactions(&mut self) {
        self.header.transactions_root = self.transactions_merkle_root();
        self.header
            .transaction_status
            .resize(self.transactions.len(), false);
    }
}
