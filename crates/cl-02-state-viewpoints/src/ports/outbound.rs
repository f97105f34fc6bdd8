use cl_01_entry_graph::Tx;
use shared_types::StorageError;

use crate::domain::UtxoViewpoint;

/// Persisted UTXO set.
pub trait UtxoStore: Send + Sync {
    /// Load into `view` every output spent by `txs` that the view has not
    /// staged (see [`UtxoViewpoint::is_staged`]). Outputs unknown to the
    /// store are left out.
    fn get_transactions_utxo(&self, view: &mut UtxoViewpoint, txs: &[Tx])
        -> Result<(), StorageError>;
}
