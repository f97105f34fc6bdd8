//! # Structural Validator
//!
//! Consensus checks that need no VM: header linkage, transaction layout,
//! entry-graph well-formedness, time ranges, native fees and proof of work.
//! Program execution is left to validators layered on top.

use cl_01_entry_graph::{Block, Tx};
use cl_03_finality::Checkpoint;
use shared_types::{sha3_256, BlockHeader, Hash, TxInput};

use crate::domain::check_proof_of_work;
use crate::error::ValidationError;
use crate::ports::{BlockValidator, PowOracle, TxValidation};

/// `sha3(header_hash || seed)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha3Pow;

impl PowOracle for Sha3Pow {
    fn pow_hash(&self, header_hash: &Hash, seed: &Hash) -> Hash {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(header_hash);
        preimage[32..].copy_from_slice(seed);
        sha3_256(&preimage)
    }
}

pub struct StructuralValidator<P: PowOracle> {
    pow: P,
}

impl<P: PowOracle> StructuralValidator<P> {
    pub fn new(pow: P) -> Self {
        Self { pow }
    }

    fn validate_header(
        &self,
        block: &Block,
        parent: &BlockHeader,
        checkpoint: &Checkpoint,
    ) -> Result<(), ValidationError> {
        let header = &block.header;
        if header.height != parent.height + 1 {
            return Err(ValidationError::MisorderedHeight {
                expected: parent.height + 1,
                found: header.height,
            });
        }
        if header.previous_block_hash != parent.hash() {
            return Err(ValidationError::MismatchedPrevHash);
        }
        if header.timestamp <= parent.timestamp {
            return Err(ValidationError::TimestampNotIncreasing {
                timestamp: header.timestamp,
                parent: parent.timestamp,
            });
        }
        if header.timestamp < checkpoint.timestamp {
            return Err(ValidationError::TimestampBeforeCheckpoint {
                timestamp: header.timestamp,
                checkpoint: checkpoint.timestamp,
            });
        }

        let pow_hash = self.pow.pow_hash(&header.hash(), &header.seed);
        if !check_proof_of_work(&pow_hash, header.bits) {
            return Err(ValidationError::BadWork);
        }
        Ok(())
    }
}

impl<P: PowOracle> BlockValidator for StructuralValidator<P> {
    fn validate_block(
        &self,
        block: &Block,
        parent: &BlockHeader,
        checkpoint: &Checkpoint,
    ) -> Result<(), ValidationError> {
        self.validate_header(block, parent, checkpoint)?;

        if block.header.transaction_status.len() != block.transactions.len() {
            return Err(ValidationError::MismatchedStatusLength {
                expected: block.transactions.len(),
                found: block.header.transaction_status.len(),
            });
        }
        if block.header.transactions_root != block.transactions_merkle_root() {
            return Err(ValidationError::MismatchedMerkleRoot);
        }

        match block.transactions.first() {
            Some(tx) if tx.is_coinbase() => {}
            _ => return Err(ValidationError::MissingCoinbase),
        }
        for (index, tx) in block.transactions.iter().enumerate() {
            if index > 0 && tx.is_coinbase() {
                return Err(ValidationError::MisplacedCoinbase(index));
            }
            tx.mapped()
                .check_well_formed()
                .map_err(|source| ValidationError::PoorlyFormed { index, source })?;
            check_time_range(tx, block.header.timestamp)?;
        }
        Ok(())
    }

    fn validate_tx(&self, tx: &Tx, parent: &BlockHeader) -> Result<TxValidation, ValidationError> {
        if tx.is_coinbase() {
            return Err(ValidationError::CoinbaseTransaction);
        }
        tx.mapped()
            .check_well_formed()
            .map_err(|source| ValidationError::PoorlyFormed { index: 0, source })?;
        check_time_range(tx, parent.timestamp)?;

        let fee = native_fee(tx)?;
        Ok(TxValidation {
            gas_only: false,
            fee,
        })
    }
}

/// Zero bounds are open.
fn check_time_range(tx: &Tx, timestamp: u64) -> Result<(), ValidationError> {
    let data = tx.data();
    let after_min = data.min_time == 0 || data.min_time <= timestamp;
    let before_max = data.max_time == 0 || timestamp <= data.max_time;
    if after_min && before_max {
        Ok(())
    } else {
        Err(ValidationError::TimeRange {
            min_time: data.min_time,
            max_time: data.max_time,
            timestamp,
        })
    }
}

fn native_fee(tx: &Tx) -> Result<u64, ValidationError> {
    let data = tx.data();
    let mut input = 0u64;
    for amount in data.inputs.iter().map(TxInput::asset_amount) {
        if amount.is_native() {
            input = input
                .checked_add(amount.amount)
                .ok_or(ValidationError::Overflow)?;
        }
    }
    let mut output = 0u64;
    for out in &data.outputs {
        if out.asset_amount.is_native() {
            output = output
                .checked_add(out.asset_amount.amount)
                .ok_or(ValidationError::Overflow)?;
        }
    }
    input
        .checked_sub(output)
        .ok_or(ValidationError::InsufficientFee { input, output })
}
