//! Chain bootstrap.

use cl_01_entry_graph::Block;
use cl_02_state_viewpoints::{ContractViewpoint, UtxoViewpoint};
use cl_03_finality::Checkpoint;
use shared_types::hash_hex;
use tracing::info;

use crate::error::ChainResult;
use crate::ports::ChainStore;

/// Write `genesis` as the best block of an empty store, with its outputs,
/// contracts and a justified checkpoint at height 0.
pub fn init_chain_status<S: ChainStore>(store: &S, genesis: &Block) -> ChainResult<()> {
    let mut utxo_view = UtxoViewpoint::new();
    utxo_view.apply_block(genesis)?;
    let mut contract_view = ContractViewpoint::new();
    contract_view.apply_block(genesis);

    let hash = genesis.hash();
    store.save_block(genesis)?;
    store.save_checkpoints(&[Checkpoint::genesis(hash, genesis.header.timestamp)])?;
    store.save_chain_status(&genesis.header, &utxo_view, &contract_view)?;

    info!(
        hash = %hash_hex(&hash),
        timestamp = genesis.header.timestamp,
        "Genesis block initialised"
    );
    Ok(())
}
