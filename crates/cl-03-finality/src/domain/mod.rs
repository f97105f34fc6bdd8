pub mod checkpoint;
pub mod slashing;
pub mod tree;
pub mod verification;

pub use checkpoint::{Checkpoint, CheckpointStatus, SupLink, Validator};
pub use tree::{CheckpointNode, CheckpointTree, NodeId};
pub use verification::Verification;
