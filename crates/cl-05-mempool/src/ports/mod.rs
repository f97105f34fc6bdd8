pub mod outbound;

pub use outbound::{SystemTimeSource, TimeSource};
