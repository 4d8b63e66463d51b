//! Signature recovery for relay calls and ERC1271 checks.
//!
//! Recovery runs in-process with `k256` so the same code path serves the contract, the tooling and
//! the tests.

use alloy_primitives::{keccak256, uint, Address, B256, U256};
use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};

use crate::errors::KeyManagerError;

pub const SIGNATURE_LEN: usize = 65;

/// Half the secp256k1 group order. Signatures with a larger `s` are malleable copies.
pub const SECP256K1_HALF_ORDER: U256 =
    uint!(0x7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0_U256);

/// Address controlled by a secp256k1 public key.
pub fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the signer of `digest` from a 65-byte `r || s || v` signature.
///
/// Accepts v in {0, 1, 27, 28}. High-s signatures are rejected.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, KeyManagerError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(KeyManagerError::InvalidSignature);
    }

    let s = U256::from_be_slice(&signature[32..64]);
    if s > SECP256K1_HALF_ORDER {
        return Err(KeyManagerError::InvalidSignature);
    }

    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return Err(KeyManagerError::InvalidSignature),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(KeyManagerError::InvalidSignature)?;
    let sig = Signature::from_slice(&signature[..64]).map_err(|_| KeyManagerError::InvalidSignature)?;

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| KeyManagerError::InvalidSignature)?;
    Ok(public_key_to_address(&key))
}
