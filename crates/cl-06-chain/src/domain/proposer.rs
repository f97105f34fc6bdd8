//! Proposer rotation.
//!
//! Starting one interval after the governing checkpoint, each validator
//! proposes `block_num_each_node` consecutive slots in turn.

/// Index into the effective validator set of the proposer for `timestamp`.
/// `None` when `timestamp` precedes the first slot or there are no
/// validators.
pub fn proposer_order(
    checkpoint_timestamp: u64,
    timestamp: u64,
    validator_count: usize,
    interval_ms: u64,
    block_num_each_node: u64,
) -> Option<usize> {
    let start = checkpoint_timestamp.checked_add(interval_ms)?;
    if timestamp < start || validator_count == 0 {
        return None;
    }
    let slot_span = block_num_each_node.max(1).checked_mul(interval_ms.max(1))?;
    let round = slot_span.checked_mul(validator_count as u64)?;

    let elapsed = timestamp - start;
    let round_start = start + elapsed / round * round;
    usize::try_from((timestamp - round_start) / slot_span).ok()
}
