pub mod contract_view;
pub mod errors;
pub mod utxo_entry;
pub mod utxo_view;

pub use contract_view::ContractViewpoint;
pub use errors::{StateError, StateResult};
pub use utxo_entry::{UtxoEntry, COINBASE_PENDING_BLOCK_NUMBER};
pub use utxo_view::UtxoViewpoint;
