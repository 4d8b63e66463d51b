//! Read access to controllers' permission state stored on the account.

use alloc::vec::Vec;

use alloy_primitives::{Address, B256};

use crate::{
    account::Erc725Account,
    allowed_calls::{decode_allowed_calls, encode_allowed_calls, AllowedCall},
    allowed_keys::{decode_allowed_data_keys, encode_allowed_data_keys},
    codec::CodecError,
    errors::KeyManagerError,
    keys::{
        allowed_calls_key, allowed_data_keys_key, decode_array_length, encode_array_length,
        permissions_array_element_key, permissions_key, ADDRESS_PERMISSIONS_ARRAY,
    },
    permissions::Permissions,
};

/// Everything stored for one controller. `None` means the key was never set (or was cleared).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Controller {
    pub address: Address,
    pub permissions: Permissions,
    pub allowed_calls: Option<Vec<AllowedCall>>,
    pub allowed_data_keys: Option<Vec<Vec<u8>>>,
}

pub struct PermissionRegistry<'a, A: Erc725Account> {
    account: &'a A,
}

impl<'a, A: Erc725Account> PermissionRegistry<'a, A> {
    pub fn new(account: &'a A) -> Self {
        Self { account }
    }

    pub fn account(&self) -> &A {
        self.account
    }

    pub fn read(&self, key: B256) -> Result<Vec<u8>, KeyManagerError> {
        Ok(self.account.get_data(key)?)
    }

    /// Permission mask of `controller`; an unset key reads as no permissions.
    pub fn permissions_of(&self, controller: Address) -> Result<Permissions, KeyManagerError> {
        let value = self.read(permissions_key(controller))?;
        // Anything other than a full word grants nothing.
        Ok(B256::try_from(value.as_slice())
            .map(Permissions::from_word)
            .unwrap_or(Permissions::NONE))
    }

    pub fn allowed_calls_of(
        &self,
        controller: Address,
    ) -> Result<Option<Vec<AllowedCall>>, KeyManagerError> {
        let value = self.read(allowed_calls_key(controller))?;
        if value.is_empty() {
            return Ok(None);
        }
        decode_allowed_calls(&value)
            .map(Some)
            .map_err(|reason| KeyManagerError::InvalidEncodedAllowedCalls { value, reason })
    }

    pub fn allowed_data_keys_of(
        &self,
        controller: Address,
    ) -> Result<Option<Vec<Vec<u8>>>, KeyManagerError> {
        let value = self.read(allowed_data_keys_key(controller))?;
        if value.is_empty() {
            return Ok(None);
        }
        decode_allowed_data_keys(&value)
            .map(Some)
            .map_err(|reason| KeyManagerError::InvalidEncodedAllowedERC725YDataKeys { value, reason })
    }

    pub fn controller(&self, address: Address) -> Result<Controller, KeyManagerError> {
        Ok(Controller {
            address,
            permissions: self.permissions_of(address)?,
            allowed_calls: self.allowed_calls_of(address)?,
            allowed_data_keys: self.allowed_data_keys_of(address)?,
        })
    }

    /// Length of `AddressPermissions[]`.
    pub fn controllers_len(&self) -> Result<u128, KeyManagerError> {
        let value = self.read(ADDRESS_PERMISSIONS_ARRAY)?;
        decode_array_length(&value).ok_or(KeyManagerError::InvalidDataValuesForDataKeys {
            key: ADDRESS_PERMISSIONS_ARRAY,
            value,
        })
    }

    /// `AddressPermissions[index]`, `None` for a cleared or malformed slot.
    pub fn controller_at(&self, index: u128) -> Result<Option<Address>, KeyManagerError> {
        let value = self.read(permissions_array_element_key(index))?;
        Ok((value.len() == 20).then(|| Address::from_slice(&value)))
    }

    /// Every listed controller, skipping holes left by cleared slots.
    pub fn controllers(&self) -> Result<Vec<Address>, KeyManagerError> {
        let mut out = Vec::new();
        for index in 0..self.controllers_len()? {
            if let Some(controller) = self.controller_at(index)? {
                out.push(controller);
            }
        }
        Ok(out)
    }
}

/// Data key/value writes that register a new controller at the end of `AddressPermissions[]`.
///
/// Allow-lists are only written when non-empty.
pub fn controller_setup(
    current_len: u128,
    controller: Address,
    permissions: Permissions,
    allowed_calls: &[AllowedCall],
    allowed_data_keys: &[Vec<u8>],
) -> Result<Vec<(B256, Vec<u8>)>, CodecError> {
    let mut writes = Vec::with_capacity(5);
    writes.push((
        ADDRESS_PERMISSIONS_ARRAY,
        encode_array_length(current_len.saturating_add(1)).to_vec(),
    ));
    writes.push((
        permissions_array_element_key(current_len),
        controller.as_slice().to_vec(),
    ));
    writes.push((permissions_key(controller), permissions.to_word().to_vec()));
    if !allowed_calls.is_empty() {
        writes.push((allowed_calls_key(controller), encode_allowed_calls(allowed_calls)?));
    }
    if !allowed_data_keys.is_empty() {
        writes.push((
            allowed_data_keys_key(controller),
            encode_allowed_data_keys(allowed_data_keys)?,
        ));
    }
    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allowed_calls::{CallTypes, ANY_STANDARD},
        testing::MemoryAccount,
    };
    use alloc::vec;
    use alloy_primitives::{address, fixed_bytes};

    const ACCOUNT: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const ALICE: Address = address!("a11ce00000000000000000000000000000000000");
    const BOB: Address = address!("b0b0000000000000000000000000000000000000");

    fn call_entry() -> AllowedCall {
        AllowedCall {
            call_types: CallTypes::CALL,
            target: BOB,
            standard: ANY_STANDARD,
            selector: fixed_bytes!("a9059cbb"),
        }
    }

    #[test]
    fn unset_controller_has_nothing() {
        let account = MemoryAccount::new(ACCOUNT);
        let registry = PermissionRegistry::new(&account);
        let controller = registry.controller(ALICE).unwrap();
        assert!(controller.permissions.is_empty());
        assert_eq!(controller.allowed_calls, None);
        assert_eq!(controller.allowed_data_keys, None);
        assert_eq!(registry.controllers_len().unwrap(), 0);
    }

    #[test]
    fn setup_writes_are_read_back() {
        let mut account = MemoryAccount::new(ACCOUNT);
        let writes = controller_setup(
            0,
            ALICE,
            Permissions::CALL | Permissions::SETDATA,
            &[call_entry()],
            &[vec![0xca, 0xfe]],
        )
        .unwrap();
        account.set_data_batch(writes);

        let registry = PermissionRegistry::new(&account);
        let alice = registry.controller(ALICE).unwrap();
        assert_eq!(alice.permissions, Permissions::CALL | Permissions::SETDATA);
        assert_eq!(alice.allowed_calls, Some(vec![call_entry()]));
        assert_eq!(alice.allowed_data_keys, Some(vec![vec![0xca, 0xfe]]));
        assert_eq!(registry.controllers().unwrap(), vec![ALICE]);
    }

    #[test]
    fn controllers_skip_cleared_slots() {
        let mut account = MemoryAccount::new(ACCOUNT);
        account.set_data_batch(controller_setup(0, ALICE, Permissions::SIGN, &[], &[]).unwrap());
        account.set_data_batch(controller_setup(1, BOB, Permissions::SIGN, &[], &[]).unwrap());
        account.set_data(permissions_array_element_key(0), vec![]);

        let registry = PermissionRegistry::new(&account);
        assert_eq!(registry.controllers_len().unwrap(), 2);
        assert_eq!(registry.controller_at(0).unwrap(), None);
        assert_eq!(registry.controllers().unwrap(), vec![BOB]);
    }

    #[test]
    fn permission_values_of_the_wrong_length_grant_nothing() {
        let mut account = MemoryAccount::new(ACCOUNT);
        account.set_data(permissions_key(ALICE), vec![0xff; 16]);
        account.set_data(permissions_key(BOB), vec![0xff; 40]);
        let registry = PermissionRegistry::new(&account);
        assert!(registry.permissions_of(ALICE).unwrap().is_empty());
        assert!(registry.permissions_of(BOB).unwrap().is_empty());
    }

    #[test]
    fn malformed_allow_lists_surface_codec_errors() {
        let mut account = MemoryAccount::new(ACCOUNT);
        account.set_data(allowed_calls_key(ALICE), vec![0x00, 0x20, 0x01]);
        account.set_data(allowed_data_keys_key(ALICE), vec![0x00]);
        let registry = PermissionRegistry::new(&account);
        assert!(matches!(
            registry.allowed_calls_of(ALICE),
            Err(KeyManagerError::InvalidEncodedAllowedCalls { .. })
        ));
        assert!(matches!(
            registry.allowed_data_keys_of(ALICE),
            Err(KeyManagerError::InvalidEncodedAllowedERC725YDataKeys { .. })
        ));
    }

    #[test]
    fn malformed_array_length_is_rejected() {
        let mut account = MemoryAccount::new(ACCOUNT);
        account.set_data(ADDRESS_PERMISSIONS_ARRAY, vec![0x01]);
        let registry = PermissionRegistry::new(&account);
        assert!(matches!(
            registry.controllers_len(),
            Err(KeyManagerError::InvalidDataValuesForDataKeys { .. })
        ));
    }
}
