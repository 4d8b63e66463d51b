//! `AddressPermissions:AllowedERC725YDataKeys:<address>` prefixes.

use alloc::vec::Vec;

use alloy_primitives::B256;

use crate::codec::{decode_compact_bytes_array, encode_compact_bytes_array, CodecError};

/// Decode a stored allowed data keys value into its key prefixes (1..=32 bytes each).
pub fn decode_allowed_data_keys(value: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    let elements = decode_compact_bytes_array(value)?;
    let mut prefixes = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        if element.len() > 32 {
            return Err(CodecError::InvalidElementLength {
                index,
                len: element.len(),
            });
        }
        prefixes.push(element.to_vec());
    }
    Ok(prefixes)
}

pub fn encode_allowed_data_keys<T: AsRef<[u8]>>(prefixes: &[T]) -> Result<Vec<u8>, CodecError> {
    for (index, prefix) in prefixes.iter().enumerate() {
        let len = prefix.as_ref().len();
        if len > 32 {
            return Err(CodecError::InvalidElementLength { index, len });
        }
    }
    encode_compact_bytes_array(prefixes)
}

/// `key` starts with `prefix`. A full 32-byte prefix is an exact key.
pub fn is_allowed_data_key(prefix: &[u8], key: &B256) -> bool {
    !prefix.is_empty() && prefix.len() <= 32 && key.as_slice().starts_with(prefix)
}
