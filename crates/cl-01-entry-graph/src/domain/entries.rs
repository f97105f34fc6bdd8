//! # Entries
//!
//! Nodes of a transaction's computation graph. An entry's id is
//! `sha3("entryid:" || type || ":" || sha3(body))`, where the body is the
//! canonical encoding of the fields listed in each `write_body`. Fields
//! prefixed `witness_` are back-links filled in after ids exist and never
//! contribute to an id.

use shared_types::{AssetAmount, ForHash, Hash, HashWriter, PublicKey};

/// A VM program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub vm_version: u64,
    pub code: Vec<u8>,
}

impl Program {
    pub fn new(vm_version: u64, code: Vec<u8>) -> Self {
        Self { vm_version, code }
    }
}

impl ForHash for Program {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write(&self.vm_version).write(&self.code);
    }
}

/// Incoming value edge: `value` flows from entry `ref_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueSource {
    pub ref_id: Hash,
    pub value: AssetAmount,
    pub position: u64,
}

impl ForHash for ValueSource {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write(&self.ref_id).write(&self.value).write(&self.position);
    }
}

/// Outgoing value edge: `value` flows to entry `ref_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueDestination {
    pub ref_id: Hash,
    pub value: AssetAmount,
    pub position: u64,
}

impl ForHash for ValueDestination {
    fn write_for_hash(&self, w: &mut HashWriter) {
        w.write(&self.ref_id).write(&self.value).write(&self.position);
    }
}

/// Definition committed to by an issued asset's id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetDefinition {
    pub initial_block_id: Hash,
    pub issuance_program: Program,
    pub data: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHeader {
    pub version: u64,
    pub serialized_size: u64,
    pub min_time: u64,
    pub max_time: u64,
    pub result_ids: Vec<Hash>,
    pub data: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mux {
    pub sources: Vec<ValueSource>,
    pub program: Program,
    pub witness_destinations: Vec<ValueDestination>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub program: Program,
    pub min_time: u64,
    pub max_time: u64,
    pub witness_anchored_id: Option<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coinbase {
    pub arbitrary: Vec<u8>,
    pub witness_destination: Option<ValueDestination>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuance {
    pub anchor_id: Hash,
    pub value: AssetAmount,
    pub ordinal: u64,
    pub witness_destination: Option<ValueDestination>,
    pub witness_asset_definition: AssetDefinition,
    pub witness_arguments: Vec<Vec<u8>>,
    pub witness_anchored_id: Option<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spend {
    pub spent_output_id: Hash,
    pub ordinal: u64,
    pub witness_destination: Option<ValueDestination>,
    pub witness_arguments: Vec<Vec<u8>>,
    pub witness_anchored_id: Option<Hash>,
}

/// A spendable result. The ordinal is positional bookkeeping only, so a
/// spend can rebuild the id of an output it did not see created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub source: ValueSource,
    pub control_program: Program,
    pub data: Hash,
    pub ordinal: u64,
    pub vote: Option<PublicKey>,
}

/// Value destroyed by an unspendable program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retirement {
    pub source: ValueSource,
    pub data: Hash,
    pub ordinal: u64,
}

/// Closed set of graph nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    TxHeader(TxHeader),
    Mux(Mux),
    Nonce(Nonce),
    Coinbase(Coinbase),
    Issuance(Issuance),
    Spend(Spend),
    Output(Output),
    Retirement(Retirement),
}

impl Entry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Entry::TxHeader(_) => "txheader",
            Entry::Mux(_) => "mux1",
            Entry::Nonce(_) => "nonce1",
            Entry::Coinbase(_) => "coinbase1",
            Entry::Issuance(_) => "issuance1",
            Entry::Spend(_) => "spend1",
            Entry::Output(_) => "output1",
            Entry::Retirement(_) => "retirement1",
        }
    }

    fn write_body(&self, w: &mut HashWriter) {
        match self {
            Entry::TxHeader(h) => {
                w.write(&h.version)
                    .write(&h.serialized_size)
                    .write(&h.min_time)
                    .write(&h.max_time)
                    .write(h.result_ids.as_slice())
                    .write(&h.data);
            }
            Entry::Mux(m) => {
                w.write_list(&m.sources).write(&m.program);
            }
            Entry::Nonce(n) => {
                w.write(&n.program).write(&n.min_time).write(&n.max_time);
            }
            Entry::Coinbase(c) => {
                w.write(&c.arbitrary);
            }
            Entry::Issuance(i) => {
                w.write(&i.anchor_id).write(&i.value);
            }
            Entry::Spend(s) => {
                w.write(&s.spent_output_id);
            }
            Entry::Output(o) => {
                w.write(&o.source)
                    .write(&o.control_program)
                    .write(&o.data)
                    .write(&o.vote);
            }
            Entry::Retirement(r) => {
                w.write(&r.source).write(&r.data);
            }
        }
    }

    /// Content address of this entry.
    pub fn id(&self) -> Hash {
        let mut body = HashWriter::new();
        self.write_body(&mut body);
        let body_hash = body.finish();

        let mut w = HashWriter::new();
        w.write_raw(b"entryid:")
            .write_raw(self.type_name().as_bytes())
            .write_raw(b":")
            .write_raw(&body_hash);
        w.finish()
    }
}
