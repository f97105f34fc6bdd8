//! The mapped (content-addressed) form of a transaction.

use std::collections::{HashMap, HashSet};

use shared_types::{hash_hex, Hash, SpendInput, ZERO_HASH};

use super::entries::{Entry, Issuance, Output, Spend, TxHeader};
use super::errors::{EntryError, EntryResult};

/// A transaction's full entry graph.
///
/// Produced once by [`map_tx`](super::mapper::map_tx) and read-only after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedTx {
    /// Id of the header entry, which is the transaction id.
    pub id: Hash,
    pub header: TxHeader,
    pub entries: HashMap<Hash, Entry>,
    /// Entry id per input ordinal. `ZERO_HASH` marks an input the mapper
    /// could not resolve.
    pub input_ids: Vec<Hash>,
    /// Nonce anchors, in input order.
    pub nonce_ids: Vec<Hash>,
    /// Outputs consumed by this transaction, in input order.
    pub spent_output_ids: Vec<Hash>,
}

impl MappedTx {
    pub fn entry(&self, id: &Hash) -> EntryResult<&Entry> {
        self.entries
            .get(id)
            .ok_or_else(|| EntryError::MissingEntry(hash_hex(id)))
    }

    pub fn output(&self, id: &Hash) -> EntryResult<&Output> {
        match self.entry(id)? {
            Entry::Output(o) => Ok(o),
            other => Err(wrong_type(id, "output1", other)),
        }
    }

    /// Flat input that spends output `id`. Arguments are left empty for
    /// the signer to fill in.
    pub fn spend_input(&self, id: &Hash) -> EntryResult<SpendInput> {
        let output = self.output(id)?;
        Ok(SpendInput {
            source_id: output.source.ref_id,
            source_position: output.source.position,
            asset_amount: output.source.value,
            vm_version: output.control_program.vm_version,
            control_program: output.control_program.code.clone(),
            reference_data_hash: output.data,
            arguments: Vec::new(),
            vote: output.vote,
        })
    }

    pub fn spend(&self, id: &Hash) -> EntryResult<&Spend> {
        match self.entry(id)? {
            Entry::Spend(s) => Ok(s),
            other => Err(wrong_type(id, "spend1", other)),
        }
    }

    pub fn issuance(&self, id: &Hash) -> EntryResult<&Issuance> {
        match self.entry(id)? {
            Entry::Issuance(i) => Ok(i),
            other => Err(wrong_type(id, "issuance1", other)),
        }
    }

    /// Entries for the header's results, in output order.
    pub fn results(&self) -> impl Iterator<Item = (&Hash, Option<&Entry>)> {
        self.header
            .result_ids
            .iter()
            .map(move |id| (id, self.entries.get(id)))
    }

    /// Structural checks the mapper tolerates but a validator must not.
    pub fn check_well_formed(&self) -> EntryResult<()> {
        for (ordinal, id) in self.input_ids.iter().enumerate() {
            if *id == ZERO_HASH {
                return Err(EntryError::PoorlyFormed {
                    ordinal,
                    reason: "unresolved input",
                });
            }
            if let Entry::Issuance(issuance) = self.entry(id)? {
                if !self.entries.contains_key(&issuance.anchor_id) {
                    return Err(EntryError::PoorlyFormed {
                        ordinal,
                        reason: "issuance anchor missing",
                    });
                }
            }
        }

        let mut seen = HashSet::with_capacity(self.spent_output_ids.len());
        for (ordinal, id) in self.spent_output_ids.iter().enumerate() {
            if !seen.insert(id) {
                return Err(EntryError::PoorlyFormed {
                    ordinal,
                    reason: "output spent twice",
                });
            }
        }

        let mut nonces = HashSet::with_capacity(self.nonce_ids.len());
        for (ordinal, id) in self.nonce_ids.iter().enumerate() {
            if !nonces.insert(id) {
                return Err(EntryError::PoorlyFormed {
                    ordinal,
                    reason: "nonce reused",
                });
            }
        }
        Ok(())
    }
}

fn wrong_type(id: &Hash, expected: &'static str, found: &Entry) -> EntryError {
    EntryError::WrongEntryType {
        id: hash_hex(id),
        expected,
        found: found.type_name(),
    }
}
