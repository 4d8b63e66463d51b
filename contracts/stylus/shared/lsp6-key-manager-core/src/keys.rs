//! Reserved ERC725Y data keys (LSP6 / LSP1 / LSP17 / LSP2 layouts).
//!
//! The byte layout of every key here is load-bearing: other tooling reads and writes the same
//! slots on the account.

use alloy_primitives::{b256, fixed_bytes, Address, FixedBytes, B256};

/// `keccak256("AddressPermissions[]")`, holds the array length as `uint128`.
pub const ADDRESS_PERMISSIONS_ARRAY: B256 =
    b256!("df30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3");

/// First 16 bytes of [`ADDRESS_PERMISSIONS_ARRAY`]; element keys append a `uint128` index.
pub const ADDRESS_PERMISSIONS_ARRAY_PREFIX: FixedBytes<16> =
    fixed_bytes!("df30dba06db6a30e65354d9a64c60986");

/// Shared prefix of every `AddressPermissions:<...>:<address>` mapping key.
pub const ADDRESS_PERMISSIONS_PREFIX: FixedBytes<6> = fixed_bytes!("4b80742de2bf");

/// `AddressPermissions:Permissions:<address>`
pub const PERMISSIONS_PREFIX: FixedBytes<12> = fixed_bytes!("4b80742de2bf82acb3630000");

/// `AddressPermissions:AllowedCalls:<address>`
pub const ALLOWED_CALLS_PREFIX: FixedBytes<12> = fixed_bytes!("4b80742de2bf393a64c70000");

/// `AddressPermissions:AllowedERC725YDataKeys:<address>`
pub const ALLOWED_DATA_KEYS_PREFIX: FixedBytes<12> = fixed_bytes!("4b80742de2bfb3cc0e490000");

/// `keccak256("LSP1UniversalReceiverDelegate")`
pub const LSP1_UNIVERSAL_RECEIVER_DELEGATE: B256 =
    b256!("0cfc51aec37c55a4d0b1a65c6255c4bf2fbdf6277f3cc0730c45b828b6db8b47");

/// `LSP1UniversalReceiverDelegate:<bytes32 typeId>`
pub const LSP1_UNIVERSAL_RECEIVER_DELEGATE_PREFIX: FixedBytes<12> =
    fixed_bytes!("0cfc51aec37c55a4d0b10000");

/// `LSP17Extension:<bytes4 selector>`
pub const LSP17_EXTENSION_PREFIX: FixedBytes<12> = fixed_bytes!("cee78b4094da860110960000");

/// Shape of a data key as far as permission classification is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKey {
    /// `AddressPermissions[]`
    PermissionsArrayLength,
    /// `AddressPermissions[index]`
    PermissionsArrayElement(u128),
    /// `AddressPermissions:Permissions:<address>`
    ControllerPermissions(Address),
    /// `AddressPermissions:AllowedCalls:<address>`
    AllowedCalls(Address),
    /// `AddressPermissions:AllowedERC725YDataKeys:<address>`
    AllowedDataKeys(Address),
    /// Carries the `AddressPermissions` prefix but no known sub-key shape.
    UnrecognisedPermission,
    /// `LSP1UniversalReceiverDelegate` or `LSP1UniversalReceiverDelegate:<typeId>`
    UniversalReceiverDelegate,
    /// `LSP17Extension:<selector>`
    Extension,
    /// Any key outside the reserved namespaces.
    Generic,
}

impl DataKey {
    pub fn parse(key: &B256) -> Self {
        let bytes = key.as_slice();

        if bytes[..16] == ADDRESS_PERMISSIONS_ARRAY_PREFIX[..] {
            if *key == ADDRESS_PERMISSIONS_ARRAY {
                return Self::PermissionsArrayLength;
            }
            let mut index = [0u8; 16];
            index.copy_from_slice(&bytes[16..]);
            return Self::PermissionsArrayElement(u128::from_be_bytes(index));
        }

        if bytes[..6] == ADDRESS_PERMISSIONS_PREFIX[..] {
            let prefix = &bytes[..12];
            let controller = Address::from_slice(&bytes[12..]);
            return if prefix == PERMISSIONS_PREFIX.as_slice() {
                Self::ControllerPermissions(controller)
            } else if prefix == ALLOWED_CALLS_PREFIX.as_slice() {
                Self::AllowedCalls(controller)
            } else if prefix == ALLOWED_DATA_KEYS_PREFIX.as_slice() {
                Self::AllowedDataKeys(controller)
            } else {
                Self::UnrecognisedPermission
            };
        }

        if *key == LSP1_UNIVERSAL_RECEIVER_DELEGATE
            || bytes[..12] == LSP1_UNIVERSAL_RECEIVER_DELEGATE_PREFIX[..]
        {
            return Self::UniversalReceiverDelegate;
        }

        if bytes[..12] == LSP17_EXTENSION_PREFIX[..] {
            return Self::Extension;
        }

        Self::Generic
    }
}

fn mapping_key(prefix: FixedBytes<12>, tail: &[u8]) -> B256 {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(prefix.as_slice());
    key[12..12 + tail.len()].copy_from_slice(tail);
    B256::from(key)
}

pub fn permissions_key(controller: Address) -> B256 {
    mapping_key(PERMISSIONS_PREFIX, controller.as_slice())
}

pub fn allowed_calls_key(controller: Address) -> B256 {
    mapping_key(ALLOWED_CALLS_PREFIX, controller.as_slice())
}

pub fn allowed_data_keys_key(controller: Address) -> B256 {
    mapping_key(ALLOWED_DATA_KEYS_PREFIX, controller.as_slice())
}

pub fn permissions_array_element_key(index: u128) -> B256 {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(ADDRESS_PERMISSIONS_ARRAY_PREFIX.as_slice());
    key[16..].copy_from_slice(&index.to_be_bytes());
    B256::from(key)
}

/// `LSP1UniversalReceiverDelegate:<typeId>` keeps the first 20 bytes of the type id.
pub fn universal_receiver_delegate_key(type_id: B256) -> B256 {
    mapping_key(LSP1_UNIVERSAL_RECEIVER_DELEGATE_PREFIX, &type_id[..20])
}

/// `LSP17Extension:<selector>`, right-padded with zeros.
pub fn extension_key(selector: FixedBytes<4>) -> B256 {
    mapping_key(LSP17_EXTENSION_PREFIX, selector.as_slice())
}

/// Decode an `AddressPermissions[]` length value: empty or a 16-byte `uint128`.
pub fn decode_array_length(value: &[u8]) -> Option<u128> {
    match value.len() {
        0 => Some(0),
        16 => {
            let mut buf = [0u8; 16];
            buf.copy_from_slice(value);
            Some(u128::from_be_bytes(buf))
        }
        _ => None,
    }
}

pub fn encode_array_length(length: u128) -> [u8; 16] {
    length.to_be_bytes()
}
