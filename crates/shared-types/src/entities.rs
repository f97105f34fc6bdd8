//! # Core Domain Entities
//!
//! The flat (wire-shaped) transaction and the block header.
//!
//! ## Clusters
//!
//! - **Values**: `AssetId`, `AssetAmount`, `NATIVE_ASSET_ID`
//! - **Transactions**: `TxData`, `TxInput`, `TxOutput`
//! - **Chain**: `BlockHeader`
//!
//! The content-addressed view of a transaction lives in the entry graph
//! crate; this module only carries what a peer sends over the wire.

use serde::{Deserialize, Serialize};

use crate::encoding::{ForHash, HashWriter};

// =============================================================================
// CLUSTER A: PRIMITIVES
// =============================================================================

/// A 32-byte SHA3-256 hash.
pub type Hash = [u8; 32];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 32-byte asset identifier.
pub type AssetId = [u8; 32];

/// The gas asset. Gas-only transactions keep only their effects in this asset.
pub const NATIVE_ASSET_ID: AssetId = [0xff; 32];

/// The all-zero hash, used where a reference is absent.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Lower-case hex rendering for log fields.
pub fn hash_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// An amount of a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AssetAmount {
    pub asset_id: AssetId,
    pub amount: u64,
}

impl AssetAmount {
    pub fn new(asset_id: AssetId, amount: u64) -> Self {
        Self { asset_id, amount }
    }

    pub fn native(amount: u64) -> Self {
        Self::new(NATIVE_ASSET_ID, amount)
    }

    pub fn is_native(&self) -> bool {
        self.asset_id == NATIVE_ASSET_ID
    }
}

impl ForHash for AssetAmount {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write(&self.asset_id).write(&self.amount);
    }
}

// =============================================================================
// CLUSTER B: FLAT TRANSACTIONS
// =============================================================================

/// Spends a previous output.
///
/// The outpoint fields (`source_id`, `source_position`, `asset_amount`,
/// `control_program`, `reference_data_hash`, `vote`) are enough to rebuild the
/// previous output's entry id without touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpendInput {
    /// Mux id that produced the spent output.
    pub source_id: Hash,
    /// Position of the spent output in its mux destinations.
    pub source_position: u64,
    pub asset_amount: AssetAmount,
    pub vm_version: u64,
    pub control_program: Vec<u8>,
    pub reference_data_hash: Hash,
    pub arguments: Vec<Vec<u8>>,
    /// Validator key when the spent output was a stake vote.
    pub vote: Option<PublicKey>,
}

/// Creates new units of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IssuanceInput {
    /// Replay-protection nonce. Empty means the issuance anchors on the
    /// transaction's first spend.
    pub nonce: Vec<u8>,
    pub amount: u64,
    pub initial_block: Hash,
    pub asset_definition: Vec<u8>,
    pub vm_version: u64,
    pub issuance_program: Vec<u8>,
    pub arguments: Vec<Vec<u8>>,
}

impl IssuanceInput {
    /// Asset id committed to by this issuance's definition and program.
    pub fn asset_id(&self) -> AssetId {
        let mut w = HashWriter::new();
        w.write("assetdefinition")
            .write(&self.initial_block)
            .write(&self.vm_version)
            .write(&self.issuance_program)
            .write(&crate::encoding::sha3_256(&self.asset_definition));
        w.finish()
    }

    pub fn asset_amount(&self) -> AssetAmount {
        AssetAmount::new(self.asset_id(), self.amount)
    }
}

/// Block reward input. Only valid as the sole input of a block's first
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CoinbaseInput {
    pub arbitrary: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxInput {
    Spend(SpendInput),
    Issuance(IssuanceInput),
    Coinbase(CoinbaseInput),
}

impl TxInput {
    pub fn asset_amount(&self) -> AssetAmount {
        match self {
            TxInput::Spend(spend) => spend.asset_amount,
            TxInput::Issuance(issuance) => issuance.asset_amount(),
            TxInput::Coinbase(_) => AssetAmount::native(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxOutput {
    pub asset_amount: AssetAmount,
    pub vm_version: u64,
    pub control_program: Vec<u8>,
    pub reference_data: Vec<u8>,
    /// Stake this output's value toward a validator.
    pub vote: Option<PublicKey>,
}

impl TxOutput {
    pub fn new(asset_amount: AssetAmount, control_program: Vec<u8>) -> Self {
        Self {
            asset_amount,
            vm_version: 1,
            control_program,
            ..Self::default()
        }
    }
}

/// A transaction as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxData {
    pub version: u64,
    /// Encoded size in bytes, supplied by the codec.
    pub serialized_size: u64,
    /// Earliest block timestamp (ms) this transaction may be included at. 0 = none.
    pub min_time: u64,
    /// Latest block timestamp (ms) this transaction may be included at. 0 = none.
    pub max_time: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub reference_data: Vec<u8>,
}

impl TxData {
    pub fn is_coinbase(&self) -> bool {
        matches!(self.inputs.as_slice(), [TxInput::Coinbase(_)])
    }
}

// =============================================================================
// CLUSTER C: THE CHAIN
// =============================================================================

/// Block header. The hash covers every field except `block_witness`, which
/// is the proposer's signature over that hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    pub version: u64,
    pub height: u64,
    pub previous_block_hash: Hash,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub transactions_root: Hash,
    pub state_root: Hash,
    /// Compact difficulty target.
    pub bits: u64,
    /// Proof-of-work seed handed to the PoW oracle.
    pub seed: Hash,
    /// `true` at index `i` when transaction `i` is gas-only.
    pub transaction_status: Vec<bool>,
    pub block_witness: Vec<u8>,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash {
        let mut w = HashWriter::new();
        w.write("blockheader")
            .write(&self.version)
            .write(&self.height)
            .write(&self.previous_block_hash)
            .write(&self.timestamp)
            .write(&self.transactions_root)
            .write(&self.state_root)
            .write(&self.bits)
            .write(&self.seed)
            .write(&pack_status_bits(&self.transaction_status));
        w.finish()
    }

    /// Whether transaction `index` is gas-only. Out-of-range indices are not.
    pub fn status_fail(&self, index: usize) -> bool {
        self.transaction_status.get(index).copied().unwrap_or(false)
    }
}

fn pack_status_bits(status: &[bool]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(8 + status.len().div_ceil(8));
    packed.extend_from_slice(&(status.len() as u64).to_le_bytes());
    for chunk in status.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, bit)| acc | (u8::from(*bit) << i));
        packed.push(byte);
    }
    packed
}
