//! In-memory account and state used by the unit and scenario tests.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use alloy_primitives::{address, Address, FixedBytes, B256, U256};
use k256::ecdsa::SigningKey;

use crate::{
    account::Erc725Account,
    allowed_calls::AllowedCall,
    classifier::{decode_payload, ExecuteCall, Operation},
    crypto::public_key_to_address,
    errors::AccountError,
    key_manager::ExecutionContext,
    permissions::Permissions,
    registry::{controller_setup, PermissionRegistry},
    relay::{relay_call_digest, relay_message},
    state::KeyManagerState,
};

pub const ACCOUNT: Address = address!("0000000000000000000000000000000000acc0de");
pub const KEY_MANAGER: Address = address!("00000000000000000000000000000000006b6d6d");
pub const CHAIN_ID: u64 = 42_161;
pub const NOW: u64 = 1_700_000_000;

/// Runs when the account executes a call to a given target.
pub type CallHook = Box<dyn FnMut(&mut MemoryAccount, &ExecuteCall) -> Result<Vec<u8>, AccountError>>;

/// What the account was asked to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardedCall {
    pub value: U256,
    pub payload: Vec<u8>,
}

/// ERC725 account backed by maps. `setData` payloads write the store, `execute` payloads run hooks.
pub struct MemoryAccount {
    address: Address,
    data: BTreeMap<B256, Vec<u8>>,
    interfaces: BTreeSet<(Address, FixedBytes<4>)>,
    hooks: BTreeMap<Address, CallHook>,
    pub forwarded: Vec<ForwardedCall>,
}

impl MemoryAccount {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            data: BTreeMap::new(),
            interfaces: BTreeSet::new(),
            hooks: BTreeMap::new(),
            forwarded: Vec::new(),
        }
    }

    pub fn set_data(&mut self, key: B256, value: Vec<u8>) {
        if value.is_empty() {
            self.data.remove(&key);
        } else {
            self.data.insert(key, value);
        }
    }

    pub fn set_data_batch(&mut self, entries: impl IntoIterator<Item = (B256, Vec<u8>)>) {
        for (key, value) in entries {
            self.set_data(key, value);
        }
    }

    pub fn data(&self, key: B256) -> Vec<u8> {
        self.data.get(&key).cloned().unwrap_or_default()
    }

    pub fn register_interface(&mut self, target: Address, interface_id: FixedBytes<4>) {
        self.interfaces.insert((target, interface_id));
    }

    pub fn on_call(&mut self, target: Address, hook: CallHook) {
        self.hooks.insert(target, hook);
    }

    /// Register `controller` at the end of `AddressPermissions[]`.
    pub fn grant(
        &mut self,
        controller: Address,
        permissions: Permissions,
        allowed_calls: &[AllowedCall],
        allowed_data_keys: &[Vec<u8>],
    ) {
        let len = PermissionRegistry::new(&*self)
            .controllers_len()
            .expect("array length");
        let writes = controller_setup(len, controller, permissions, allowed_calls, allowed_data_keys)
            .expect("controller setup");
        self.set_data_batch(writes);
    }

    fn run_call(&mut self, call: &ExecuteCall) -> Result<Vec<u8>, AccountError> {
        let Some(mut hook) = self.hooks.remove(&call.target) else {
            return Ok(Vec::new());
        };
        let result = hook(self, call);
        self.hooks.insert(call.target, hook);
        result
    }
}

impl Erc725Account for MemoryAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn get_data(&self, key: B256) -> Result<Vec<u8>, AccountError> {
        Ok(self.data(key))
    }

    fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool {
        self.interfaces.contains(&(target, interface_id))
    }

    fn forward(&mut self, value: U256, payload: &[u8]) -> Result<Vec<u8>, AccountError> {
        self.forwarded.push(ForwardedCall {
            value,
            payload: payload.to_vec(),
        });
        let decoded = decode_payload(payload).map_err(|_| AccountError::Reverted(Vec::new()))?;
        match decoded.operation {
            Operation::SetData(entries) => {
                self.set_data_batch(entries);
                Ok(Vec::new())
            }
            Operation::Execute(calls) => {
                let mut last = Vec::new();
                for call in &calls {
                    last = self.run_call(call)?;
                }
                Ok(last)
            }
            Operation::ChangeOwner => Ok(Vec::new()),
        }
    }
}

/// Key manager state backed by maps.
#[derive(Debug, Default)]
pub struct MemoryState {
    nonces: BTreeMap<(Address, u128), u128>,
    reentrancy: bool,
}

impl KeyManagerState for MemoryState {
    fn nonce(&self, signer: Address, channel: u128) -> u128 {
        self.nonces.get(&(signer, channel)).copied().unwrap_or_default()
    }

    fn set_nonce(&mut self, signer: Address, channel: u128, counter: u128) {
        self.nonces.insert((signer, channel), counter);
    }

    fn reentrancy_status(&self) -> bool {
        self.reentrancy
    }

    fn set_reentrancy_status(&mut self, active: bool) {
        self.reentrancy = active;
    }
}

/// Shared state, so a nested key manager built inside a call hook sees the outer one's flag.
impl KeyManagerState for Rc<RefCell<MemoryState>> {
    fn nonce(&self, signer: Address, channel: u128) -> u128 {
        self.borrow().nonce(signer, channel)
    }

    fn set_nonce(&mut self, signer: Address, channel: u128, counter: u128) {
        self.borrow_mut().set_nonce(signer, channel, counter)
    }

    fn reentrancy_status(&self) -> bool {
        self.borrow().reentrancy_status()
    }

    fn set_reentrancy_status(&mut self, active: bool) {
        self.borrow_mut().set_reentrancy_status(active)
    }
}

pub fn context(caller: Address) -> ExecutionContext {
    ExecutionContext {
        chain_id: CHAIN_ID,
        key_manager: KEY_MANAGER,
        timestamp: NOW,
        caller,
        value: U256::ZERO,
    }
}

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).expect("valid scalar")
}

pub fn signer_address(key: &SigningKey) -> Address {
    public_key_to_address(key.verifying_key())
}

/// 65-byte `r || s || v` signature over `digest`, v in {27, 28}.
pub fn sign_digest(key: &SigningKey, digest: B256) -> Vec<u8> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .expect("signing");
    let mut out = signature.to_bytes().to_vec();
    out.push(recovery_id.to_byte() + 27);
    out
}

/// Sign a relay call for [`KEY_MANAGER`] on [`CHAIN_ID`].
pub fn sign_relay_call(
    key: &SigningKey,
    nonce: U256,
    validity_timestamps: U256,
    value: U256,
    payload: &[u8],
) -> Vec<u8> {
    let message = relay_message(CHAIN_ID, nonce, validity_timestamps, value, payload);
    sign_digest(key, relay_call_digest(KEY_MANAGER, &message))
}
