//! OEV template ID derivation
//!
//! Each beacon's OEV updates are published under a secondary template ID
//! derived from the primary one: the template ID is read as an unsigned
//! big-endian integer, shortened to its minimal byte representation, and
//! hashed with Keccak-256. This mirrors `keccak256(toBeHex(templateId))`.

use ethers::types::{H256, U256};
use ethers::utils::keccak256;

/// Derive the OEV template ID for a beacon's primary template ID.
///
/// Deterministic and infallible for any 32-byte input.
pub fn derive_oev_template_id(template_id: H256) -> H256 {
    let value = U256::from_big_endian(template_id.as_bytes());
    H256::from(keccak256(minimal_be_bytes(value)))
}

/// Minimal big-endian byte form of `value`; a single zero byte for zero.
fn minimal_be_bytes(value: U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let first = buf.iter().position(|b| *b != 0).unwrap_or(31);
    buf[first..].to_vec()
}
