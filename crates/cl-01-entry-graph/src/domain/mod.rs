//! Pure entry-graph logic.

pub mod entries;
pub mod errors;
pub mod mapped;
pub mod mapper;
pub mod merkle;
pub mod program;

pub use entries::*;
pub use errors::{EntryError, EntryResult};
pub use mapped::MappedTx;
pub use mapper::map_tx;
pub use merkle::merkle_root;
