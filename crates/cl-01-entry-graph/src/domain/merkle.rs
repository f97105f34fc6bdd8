//! Transaction merkle root.
//!
//! Leaves are hashed with a `0x00` prefix and interior nodes with `0x01`.
//! A list of `n > 1` items splits at the largest power of two below `n`.

use shared_types::{sha3_256, Hash, HashWriter};

const LEAF_PREFIX: u8 = 0x00;
const INTERIOR_PREFIX: u8 = 0x01;

pub fn merkle_root(items: &[Hash]) -> Hash {
    match items {
        [] => sha3_256(&[]),
        [leaf] => {
            let mut w = HashWriter::new();
            w.write_raw(&[LEAF_PREFIX]).write_raw(leaf);
            w.finish()
        }
        _ => {
            let split = prev_power_of_two(items.len());
            let left = merkle_root(&items[..split]);
            let right = merkle_root(&items[split..]);
            let mut w = HashWriter::new();
            w.write_raw(&[INTERIOR_PREFIX])
                .write_raw(&left)
                .write_raw(&right);
            w.finish()
        }
    }
}

/// Largest power of two strictly less than `n` (`n >= 2`).
fn prev_power_of_two(n: usize) -> usize {
    let p = n.next_power_of_two();
    if p == n {
        n / 2
    } else {
        p / 2
    }
}
