pub mod inbound;
pub mod outbound;

pub use inbound::ChainQueries;
pub use outbound::{BlockValidator, ChainStore, PowOracle, TxValidation};
