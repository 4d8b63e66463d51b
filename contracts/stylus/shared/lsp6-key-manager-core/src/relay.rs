//! LSP25 relay calls: message layout, signed digest, multi-channel nonces and validity windows.

use alloc::vec::Vec;

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::{errors::KeyManagerError, state::KeyManagerState};

/// Version tag prepended to every relay message.
pub const LSP25_VERSION: U256 = U256::from_limbs([25, 0, 0, 0]);

/// `abi.encodePacked(LSP25_VERSION, chainId, nonce, validityTimestamps, value, payload)`.
pub fn relay_message(
    chain_id: u64,
    nonce: U256,
    validity_timestamps: U256,
    value: U256,
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 * 5 + payload.len());
    buf.extend_from_slice(&LSP25_VERSION.to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(&nonce.to_be_bytes::<32>());
    buf.extend_from_slice(&validity_timestamps.to_be_bytes::<32>());
    buf.extend_from_slice(&value.to_be_bytes::<32>());
    buf.extend_from_slice(payload);
    buf
}

/// EIP-191 version 0 digest ("data with intended validator") bound to the key manager.
pub fn relay_call_digest(key_manager: Address, message: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(2 + 20 + message.len());
    buf.push(0x19);
    buf.push(0x00);
    buf.extend_from_slice(key_manager.as_slice());
    buf.extend_from_slice(message);
    keccak256(&buf)
}

/// Split a relay nonce into `(channel, counter)`.
pub fn split_nonce(nonce: U256) -> (u128, u128) {
    let limbs = nonce.as_limbs();
    let counter = (limbs[1] as u128) << 64 | limbs[0] as u128;
    let channel = (limbs[3] as u128) << 64 | limbs[2] as u128;
    (channel, counter)
}

pub fn compose_nonce(channel: u128, counter: u128) -> U256 {
    U256::from(channel) << 128usize | U256::from(counter)
}

/// Split `validityTimestamps` into `(start, end)`.
pub fn split_validity_timestamps(validity_timestamps: U256) -> (u128, u128) {
    split_nonce(validity_timestamps)
}

/// Zero means "no window". A non-zero start with a zero end only bounds the start.
pub fn check_validity_timestamps(validity_timestamps: U256, now: u64) -> Result<(), KeyManagerError> {
    if validity_timestamps.is_zero() {
        return Ok(());
    }
    let (start, end) = split_validity_timestamps(validity_timestamps);
    let now = now as u128;
    if now < start {
        return Err(KeyManagerError::RelayCallBeforeStartTime);
    }
    if end != 0 && now > end {
        return Err(KeyManagerError::RelayCallExpired);
    }
    Ok(())
}

/// Check `nonce` against the signer's channel counter and advance the counter.
pub fn consume_nonce<S: KeyManagerState>(
    state: &mut S,
    signer: Address,
    nonce: U256,
    signature: &[u8],
) -> Result<(), KeyManagerError> {
    let (channel, counter) = split_nonce(nonce);
    let current = state.nonce(signer, channel);
    if counter != current {
        return Err(KeyManagerError::InvalidRelayNonce {
            signer,
            nonce,
            signature: signature.to_vec(),
        });
    }
    state.set_nonce(signer, channel, current.wrapping_add(1));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryState;
    use alloy_primitives::{address, hex};

    const SIGNER: Address = address!("cafecafecafecafecafecafecafecafecafecafe");

    #[test]
    fn message_is_packed_words_then_payload() {
        let message = relay_message(42, U256::from(7), U256::ZERO, U256::from(1), &[0xaa, 0xbb]);
        assert_eq!(message.len(), 32 * 5 + 2);
        assert_eq!(message[31], 25);
        assert_eq!(message[63], 42);
        assert_eq!(message[95], 7);
        assert_eq!(message[159], 1);
        assert_eq!(&message[160..], &[0xaa, 0xbb]);
    }

    #[test]
    fn digest_binds_the_key_manager() {
        let message = relay_message(1, U256::ZERO, U256::ZERO, U256::ZERO, &hex!("44c028fe"));
        let a = relay_call_digest(address!("1111111111111111111111111111111111111111"), &message);
        let b = relay_call_digest(address!("2222222222222222222222222222222222222222"), &message);
        assert_ne!(a, b);

        let mut preimage = vec![0x19, 0x00];
        preimage.extend_from_slice(&[0x11; 20]);
        preimage.extend_from_slice(&message);
        assert_eq!(a, keccak256(&preimage));
    }

    #[test]
    fn nonce_word_packs_channel_high_counter_low() {
        let nonce = compose_nonce(3, 9);
        assert_eq!(nonce, (U256::from(3) << 128usize) + U256::from(9));
        assert_eq!(split_nonce(nonce), (3, 9));
        assert_eq!(split_nonce(compose_nonce(u128::MAX, u128::MAX)), (u128::MAX, u128::MAX));
    }

    #[test]
    fn validity_window_bounds() {
        let window = compose_nonce(100, 200);
        assert_eq!(
            check_validity_timestamps(window, 99),
            Err(KeyManagerError::RelayCallBeforeStartTime)
        );
        assert_eq!(check_validity_timestamps(window, 100), Ok(()));
        assert_eq!(check_validity_timestamps(window, 200), Ok(()));
        assert_eq!(check_validity_timestamps(window, 201), Err(KeyManagerError::RelayCallExpired));

        assert_eq!(check_validity_timestamps(U256::ZERO, 0), Ok(()));
        assert_eq!(check_validity_timestamps(compose_nonce(100, 0), u64::MAX), Ok(()));
        assert_eq!(
            check_validity_timestamps(compose_nonce(0, 50), 51),
            Err(KeyManagerError::RelayCallExpired)
        );
    }

    #[test]
    fn nonce_must_equal_counter_and_is_consumed_once() {
        let mut state = MemoryState::default();
        let nonce = compose_nonce(5, 0);
        assert_eq!(consume_nonce(&mut state, SIGNER, nonce, &[]), Ok(()));
        assert_eq!(state.nonce(SIGNER, 5), 1);
        assert!(matches!(
            consume_nonce(&mut state, SIGNER, nonce, &[]),
            Err(KeyManagerError::InvalidRelayNonce { .. })
        ));
        assert!(matches!(
            consume_nonce(&mut state, SIGNER, compose_nonce(5, 2), &[]),
            Err(KeyManagerError::InvalidRelayNonce { .. })
        ));
        assert_eq!(state.nonce(SIGNER, 5), 1);
        assert_eq!(state.nonce(SIGNER, 0), 0);
    }
}
