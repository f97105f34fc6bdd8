//! # Entry-Graph Mapper
//!
//! Turns a flat [`TxData`] into its [`MappedTx`]. Pure and infallible:
//! structural defects are left in the graph for
//! [`MappedTx::check_well_formed`] to report.
//!
//! ```text
//!  spend ────┐              ┌──► output ──────┐
//!  issuance ─┼──► mux ──────┤                 ├──► header (result ids)
//!  coinbase ─┘              └──► retirement ──┘
//! ```

use std::collections::HashMap;

use shared_types::{
    sha3_256, AssetAmount, Hash, IssuanceInput, SpendInput, TxData, TxInput, ZERO_HASH,
};

use super::entries::{
    AssetDefinition, Coinbase, Entry, Issuance, Mux, Nonce, Output, Program, Retirement, Spend,
    TxHeader, ValueDestination, ValueSource,
};
use super::mapped::MappedTx;
use super::program::{is_unspendable, nonce_program, DEFAULT_VM_VERSION, OP_TRUE};

/// Map a flat transaction to its entry graph.
pub fn map_tx(tx: &TxData) -> MappedTx {
    let mut entries: HashMap<Hash, Entry> = HashMap::new();
    let mut input_ids = vec![ZERO_HASH; tx.inputs.len()];
    let mut mux_sources: Vec<Option<ValueSource>> = vec![None; tx.inputs.len()];
    let mut nonce_ids = Vec::new();
    let mut spent_output_ids = Vec::new();

    if tx.is_coinbase() {
        if let [TxInput::Coinbase(input)] = tx.inputs.as_slice() {
            let coinbase = Entry::Coinbase(Coinbase {
                arbitrary: input.arbitrary.clone(),
                witness_destination: None,
            });
            let id = coinbase.id();
            let value = tx
                .outputs
                .first()
                .map(|o| o.asset_amount)
                .unwrap_or_else(|| AssetAmount::native(0));
            mux_sources[0] = Some(ValueSource {
                ref_id: id,
                value,
                position: 0,
            });
            input_ids[0] = id;
            entries.insert(id, coinbase);
        }
    } else {
        // Spends first: the first one anchors nonce-less issuances.
        let mut first_spend = None;
        for (ordinal, input) in tx.inputs.iter().enumerate() {
            let TxInput::Spend(input) = input else {
                continue;
            };
            let (spend_id, spent_output_id) = map_spend(input, ordinal, &mut entries);
            first_spend.get_or_insert(spend_id);
            spent_output_ids.push(spent_output_id);
            input_ids[ordinal] = spend_id;
            mux_sources[ordinal] = Some(ValueSource {
                ref_id: spend_id,
                value: input.asset_amount,
                position: 0,
            });
        }

        for (ordinal, input) in tx.inputs.iter().enumerate() {
            let TxInput::Issuance(input) = input else {
                continue;
            };
            let anchor_id = if input.nonce.is_empty() {
                first_spend.unwrap_or(ZERO_HASH)
            } else {
                let nonce = map_nonce(tx, input);
                let id = nonce.id();
                entries.insert(id, nonce);
                nonce_ids.push(id);
                id
            };
            let issuance_id = map_issuance(input, anchor_id, ordinal, &mut entries);
            input_ids[ordinal] = issuance_id;
            mux_sources[ordinal] = Some(ValueSource {
                ref_id: issuance_id,
                value: input.asset_amount(),
                position: 0,
            });
        }
    }

    let sources: Vec<ValueSource> = mux_sources.into_iter().flatten().collect();
    let mux = Entry::Mux(Mux {
        sources: sources.clone(),
        program: Program::new(DEFAULT_VM_VERSION, vec![OP_TRUE]),
        witness_destinations: Vec::new(),
    });
    let mux_id = mux.id();
    entries.insert(mux_id, mux);

    let mut result_ids = Vec::with_capacity(tx.outputs.len());
    let mut destinations = Vec::with_capacity(tx.outputs.len());
    for (ordinal, out) in tx.outputs.iter().enumerate() {
        let source = ValueSource {
            ref_id: mux_id,
            value: out.asset_amount,
            position: ordinal as u64,
        };
        let data = sha3_256(&out.reference_data);
        let result = if is_unspendable(&out.control_program) {
            Entry::Retirement(Retirement {
                source,
                data,
                ordinal: ordinal as u64,
            })
        } else {
            Entry::Output(Output {
                source,
                control_program: Program::new(out.vm_version, out.control_program.clone()),
                data,
                ordinal: ordinal as u64,
                vote: out.vote,
            })
        };
        let id = result.id();
        entries.insert(id, result);
        result_ids.push(id);
        destinations.push(ValueDestination {
            ref_id: id,
            value: out.asset_amount,
            position: 0,
        });
    }

    if let Some(Entry::Mux(mux)) = entries.get_mut(&mux_id) {
        mux.witness_destinations = destinations;
    }
    link_inputs_to_mux(&mut entries, &sources, mux_id);
    link_anchors(&mut entries, &input_ids);

    let header = TxHeader {
        version: tx.version,
        serialized_size: tx.serialized_size,
        min_time: tx.min_time,
        max_time: tx.max_time,
        result_ids,
        data: sha3_256(&tx.reference_data),
    };
    let header_entry = Entry::TxHeader(header.clone());
    let id = header_entry.id();
    entries.insert(id, header_entry);

    MappedTx {
        id,
        header,
        entries,
        input_ids,
        nonce_ids,
        spent_output_ids,
    }
}

/// Rebuilds the spent output from its outpoint and wraps it in a spend.
/// Returns `(spend id, spent output id)`.
fn map_spend(
    input: &SpendInput,
    ordinal: usize,
    entries: &mut HashMap<Hash, Entry>,
) -> (Hash, Hash) {
    let prevout = Entry::Output(Output {
        source: ValueSource {
            ref_id: input.source_id,
            value: input.asset_amount,
            position: input.source_position,
        },
        control_program: Program::new(input.vm_version, input.control_program.clone()),
        data: input.reference_data_hash,
        ordinal: input.source_position,
        vote: input.vote,
    });
    let spent_output_id = prevout.id();
    entries.insert(spent_output_id, prevout);

    let spend = Entry::Spend(Spend {
        spent_output_id,
        ordinal: ordinal as u64,
        witness_destination: None,
        witness_arguments: input.arguments.clone(),
        witness_anchored_id: None,
    });
    let spend_id = spend.id();
    entries.insert(spend_id, spend);
    (spend_id, spent_output_id)
}

fn map_nonce(tx: &TxData, input: &IssuanceInput) -> Entry {
    let asset_id = input.asset_id();
    Entry::Nonce(Nonce {
        program: Program::new(input.vm_version, nonce_program(&input.nonce, &asset_id)),
        min_time: tx.min_time,
        max_time: tx.max_time,
        witness_anchored_id: None,
    })
}

fn map_issuance(
    input: &IssuanceInput,
    anchor_id: Hash,
    ordinal: usize,
    entries: &mut HashMap<Hash, Entry>,
) -> Hash {
    let issuance = Entry::Issuance(Issuance {
        anchor_id,
        value: input.asset_amount(),
        ordinal: ordinal as u64,
        witness_destination: None,
        witness_asset_definition: AssetDefinition {
            initial_block_id: input.initial_block,
            issuance_program: Program::new(input.vm_version, input.issuance_program.clone()),
            data: sha3_256(&input.asset_definition),
        },
        witness_arguments: input.arguments.clone(),
        witness_anchored_id: None,
    });
    let id = issuance.id();
    entries.insert(id, issuance);
    id
}

fn link_inputs_to_mux(entries: &mut HashMap<Hash, Entry>, sources: &[ValueSource], mux_id: Hash) {
    for (position, source) in sources.iter().enumerate() {
        let destination = Some(ValueDestination {
            ref_id: mux_id,
            value: source.value,
            position: position as u64,
        });
        match entries.get_mut(&source.ref_id) {
            Some(Entry::Spend(s)) => s.witness_destination = destination,
            Some(Entry::Issuance(i)) => i.witness_destination = destination,
            Some(Entry::Coinbase(c)) => c.witness_destination = destination,
            _ => {}
        }
    }
}

/// Points each anchor (nonce or spend) at the issuance that used it.
fn link_anchors(entries: &mut HashMap<Hash, Entry>, input_ids: &[Hash]) {
    let anchors: Vec<(Hash, Hash)> = input_ids
        .iter()
        .filter_map(|id| match entries.get(id) {
            Some(Entry::Issuance(i)) => Some((i.anchor_id, *id)),
            _ => None,
        })
        .collect();

    for (anchor_id, issuance_id) in anchors {
        match entries.get_mut(&anchor_id) {
            Some(Entry::Nonce(n)) => n.witness_anchored_id = Some(issuance_id),
            Some(Entry::Spend(s)) => s.witness_anchored_id = Some(issuance_id),
            _ => {}
        }
    }
}
