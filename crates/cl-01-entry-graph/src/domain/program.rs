//! VM opcodes and script builders used by the mapper and the contract
//! registry. Execution semantics live in the validation layer.

use shared_types::AssetId;

pub const OP_0: u8 = 0x00;
pub const OP_DATA_1: u8 = 0x01;
pub const OP_DATA_75: u8 = 0x4b;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_TRUE: u8 = 0x51;
pub const OP_FAIL: u8 = 0x6a;
pub const OP_DROP: u8 = 0x75;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_ASSET: u8 = 0xc2;

/// Default VM version for synthesized programs.
pub const DEFAULT_VM_VERSION: u64 = 1;

/// Contract registry marker.
pub const BCRP: &[u8] = b"bcrp";
pub const BCRP_VERSION: u8 = 1;

/// Shortest push of `data`.
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);
    match len {
        0 => out.push(OP_0),
        1..=75 => out.push(OP_DATA_1 + (len as u8) - 1),
        76..=0xff => {
            out.push(OP_PUSHDATA1);
            out.push(len as u8);
        }
        0x100..=0xffff => {
            out.push(OP_PUSHDATA2);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        _ => {
            out.push(OP_PUSHDATA4);
            out.extend_from_slice(&(len as u32).to_le_bytes());
        }
    }
    out.extend_from_slice(data);
    out
}

/// `<nonce> DROP ASSET <asset_id> EQUAL`
pub fn nonce_program(nonce: &[u8], asset_id: &AssetId) -> Vec<u8> {
    let mut prog = push_data(nonce);
    prog.push(OP_DROP);
    prog.push(OP_ASSET);
    prog.extend(push_data(asset_id));
    prog.push(OP_EQUAL);
    prog
}

/// Programs starting with `OP_FAIL` can never be satisfied.
pub fn is_unspendable(program: &[u8]) -> bool {
    program.first() == Some(&OP_FAIL)
}

/// `FAIL PUSHDATA1 "bcrp" PUSHDATA1 <version> PUSHDATA1 <contract>`
pub fn bcrp_program(contract: &[u8]) -> Option<Vec<u8>> {
    let contract_len = u8::try_from(contract.len()).ok()?;
    let mut prog = vec![OP_FAIL, OP_PUSHDATA1, BCRP.len() as u8];
    prog.extend_from_slice(BCRP);
    prog.extend_from_slice(&[OP_PUSHDATA1, 1, BCRP_VERSION, OP_PUSHDATA1, contract_len]);
    prog.extend_from_slice(contract);
    Some(prog)
}

/// Whether `program` is a contract registration script.
pub fn is_bcrp_script(program: &[u8]) -> bool {
    let Some(rest) = program.strip_prefix(&[OP_FAIL]) else {
        return false;
    };
    let Some((marker, rest)) = read_pushdata1(rest) else {
        return false;
    };
    let Some((version, rest)) = read_pushdata1(rest) else {
        return false;
    };
    let Some((_contract, rest)) = read_pushdata1(rest) else {
        return false;
    };
    marker == BCRP && version == [BCRP_VERSION] && rest.is_empty()
}

fn read_pushdata1(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&op, rest) = bytes.split_first()?;
    if op != OP_PUSHDATA1 {
        return None;
    }
    let (&len, rest) = rest.split_first()?;
    let len = usize::from(len);
    (rest.len() >= len).then(|| rest.split_at(len))
}
