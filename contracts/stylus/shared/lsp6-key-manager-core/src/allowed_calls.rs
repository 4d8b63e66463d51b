//! `AddressPermissions:AllowedCalls:<address>` entries and matching.
//!
//! Each entry is 32 bytes: `bytes4 callTypes || bytes20 address || bytes4 interfaceId || bytes4 selector`,
//! stored as a compact bytes array.

use core::ops::BitOr;

use alloc::vec::Vec;

use alloy_primitives::{Address, FixedBytes};

use crate::codec::{decode_compact_bytes_array, encode_compact_bytes_array, CodecError};

pub const ENTRY_LEN: usize = 32;

pub const ANY_ADDRESS: Address = Address::repeat_byte(0xff);
pub const ANY_STANDARD: FixedBytes<4> = FixedBytes::repeat_byte(0xff);
pub const ANY_SELECTOR: FixedBytes<4> = FixedBytes::repeat_byte(0xff);

/// Call-type restriction mask of an allowed call entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallTypes(pub u32);

impl CallTypes {
    pub const NONE: Self = Self(0);
    pub const VALUE: Self = Self(0x01);
    pub const CALL: Self = Self(0x02);
    pub const STATICCALL: Self = Self(0x04);
    pub const DELEGATECALL: Self = Self(0x08);

    pub fn contains(self, required: CallTypes) -> bool {
        self.0 & required.0 == required.0
    }
}

impl BitOr for CallTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What a controller is trying to do, as seen by the matcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallRequest {
    pub call_types: CallTypes,
    pub target: Address,
    pub selector: FixedBytes<4>,
}

/// One decoded allowed call entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllowedCall {
    pub call_types: CallTypes,
    pub target: Address,
    pub standard: FixedBytes<4>,
    pub selector: FixedBytes<4>,
}

impl AllowedCall {
    pub fn from_bytes(bytes: &[u8; ENTRY_LEN]) -> Self {
        let mut call_types = [0u8; 4];
        call_types.copy_from_slice(&bytes[0..4]);
        Self {
            call_types: CallTypes(u32::from_be_bytes(call_types)),
            target: Address::from_slice(&bytes[4..24]),
            standard: FixedBytes::from_slice(&bytes[24..28]),
            selector: FixedBytes::from_slice(&bytes[28..32]),
        }
    }

    pub fn to_bytes(&self) -> [u8; ENTRY_LEN] {
        let mut out = [0u8; ENTRY_LEN];
        out[0..4].copy_from_slice(&self.call_types.0.to_be_bytes());
        out[4..24].copy_from_slice(self.target.as_slice());
        out[24..28].copy_from_slice(self.standard.as_slice());
        out[28..32].copy_from_slice(self.selector.as_slice());
        out
    }

    /// Address, standard and selector all wildcards. Such an entry is refused at match time.
    pub fn is_unrestricted(&self) -> bool {
        self.target == ANY_ADDRESS && self.standard == ANY_STANDARD && self.selector == ANY_SELECTOR
    }

    /// `supports_standard` is only consulted when the entry pins an interface id.
    pub fn matches<F>(&self, request: &CallRequest, supports_standard: F) -> bool
    where
        F: FnOnce(Address, FixedBytes<4>) -> bool,
    {
        if !self.call_types.contains(request.call_types) {
            return false;
        }
        if self.target != ANY_ADDRESS && self.target != request.target {
            return false;
        }
        if self.selector != ANY_SELECTOR && self.selector != request.selector {
            return false;
        }
        self.standard == ANY_STANDARD || supports_standard(request.target, self.standard)
    }
}

/// Decode a stored allowed calls value. An empty value decodes to an empty list.
pub fn decode_allowed_calls(value: &[u8]) -> Result<Vec<AllowedCall>, CodecError> {
    let elements = decode_compact_bytes_array(value)?;
    let mut calls = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let entry: &[u8; ENTRY_LEN] = element
            .try_into()
            .map_err(|_| CodecError::InvalidElementLength {
                index,
                len: element.len(),
            })?;
        calls.push(AllowedCall::from_bytes(entry));
    }
    Ok(calls)
}

pub fn encode_allowed_calls(calls: &[AllowedCall]) -> Result<Vec<u8>, CodecError> {
    let entries: Vec<[u8; ENTRY_LEN]> = calls.iter().map(AllowedCall::to_bytes).collect();
    encode_compact_bytes_array(&entries)
}
