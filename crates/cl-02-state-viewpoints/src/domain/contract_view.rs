//! Contract-registry bookkeeping. Registration scripts found in a block's
//! outputs are recorded as `sha3(program) -> txid || program`.

use std::collections::HashMap;

use cl_01_entry_graph::{program::is_bcrp_script, Block, Tx};
use shared_types::{sha3_256, Hash};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractViewpoint {
    pub attach_entries: HashMap<Hash, Vec<u8>>,
    pub detach_entries: HashMap<Hash, Vec<u8>>,
}

impl ContractViewpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            for (hash, value) in registrations(tx) {
                self.attach_entries.insert(hash, value);
            }
        }
    }

    pub fn detach_block(&mut self, block: &Block) {
        for tx in block.transactions.iter().rev() {
            for (hash, value) in registrations(tx) {
                self.detach_entries.insert(hash, value);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attach_entries.is_empty() && self.detach_entries.is_empty()
    }
}

fn registrations(tx: &Tx) -> impl Iterator<Item = (Hash, Vec<u8>)> + '_ {
    let id = tx.id();
    tx.data()
        .outputs
        .iter()
        .map(|o| o.control_program.as_slice())
        .filter(|program| is_bcrp_script(program))
        .map(move |program| {
            let mut value = Vec::with_capacity(id.len() + program.len());
            value.extend_from_slice(&id);
            value.extend_from_slice(program);
            (sha3_256(program), value)
        })
}
