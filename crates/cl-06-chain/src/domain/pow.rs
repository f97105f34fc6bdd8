//! Compact difficulty targets.
//!
//! A compact target packs a 55-bit mantissa, a sign bit (bit 55) and a
//! base-256 exponent (bits 56-63): `target = mantissa * 256^(exponent - 3)`.

use primitive_types::U256;
use shared_types::Hash;

const MANTISSA_MASK: u64 = 0x007f_ffff_ffff_ffff;
const SIGN_BIT: u64 = 0x0080_0000_0000_0000;

/// Expand `compact` into a target. `None` for negative targets; values
/// wider than 256 bits saturate.
pub fn compact_to_big(compact: u64) -> Option<U256> {
    if compact & SIGN_BIT != 0 {
        return None;
    }
    let mut mantissa = compact & MANTISSA_MASK;
    let exponent = (compact >> 56) as usize;

    if exponent <= 3 {
        mantissa >>= 8 * (3 - exponent);
        return Some(U256::from(mantissa));
    }

    let mantissa = U256::from(mantissa);
    let shift = 8 * (exponent - 3);
    if mantissa.is_zero() {
        return Some(U256::zero());
    }
    if mantissa.bits() + shift > 256 {
        return Some(U256::MAX);
    }
    Some(mantissa << shift)
}

/// Interpret `hash` as a little-endian integer.
pub fn hash_to_big(hash: &Hash) -> U256 {
    U256::from_little_endian(hash)
}

/// Whether `pow_hash` meets the target encoded in `bits`.
pub fn check_proof_of_work(pow_hash: &Hash, bits: u64) -> bool {
    compact_to_big(bits).is_some_and(|target| hash_to_big(pow_hash) <= target)
}
