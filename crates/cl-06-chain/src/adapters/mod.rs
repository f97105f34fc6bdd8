mod ledger_store;
mod structural_validator;

pub use structural_validator::{Sha3Pow, StructuralValidator};
