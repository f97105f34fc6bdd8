pub mod orphan;
pub mod pow;
pub mod proposer;

pub use orphan::OrphanManage;
pub use pow::{check_proof_of_work, compact_to_big, hash_to_big};
pub use proposer::proposer_order;
