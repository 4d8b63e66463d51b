//! Stylus entrypoint of the LSP6 Key Manager.
//!
//! Storage holds the linked account, relay nonces and the reentrancy flag. Each public method
//! builds an [`ExecutionContext`] from the VM and hands the request to the core [`KeyManager`].

use alloc::{vec, vec::Vec};

use alloy_sol_types::sol;
use stylus_sdk::{
    abi::Bytes,
    alloy_primitives::{keccak256, Address, FixedBytes, B256, U256},
    prelude::*,
    stylus_core::log,
};

use lsp6_key_manager_core::{
    key_manager::is_valid_signature,
    relay::compose_nonce,
    ExecutionContext, ExecutionOutcome, KeyManager, KeyManagerError, KeyManagerState,
};

use crate::{account::OnchainAccount, errors::ContractError};

/// Gas cap for each `getData` read on the account.
const READ_GAS: u64 = 100_000;

sol! {
    event VerifiedCall(address indexed signer, uint256 indexed value, bytes4 indexed selector);
    event RelayCallExecuted(address indexed signer, uint256 nonce);
}

sol_storage! {
    #[entrypoint]
    pub struct Lsp6KeyManager {
        /// The ERC725 account this key manager controls.
        address target;

        /// Relay nonce counter for keccak256(signer || channelId).
        mapping(bytes32 => uint256) nonces;

        bool reentrancy_active;
    }
}

fn nonce_slot(signer: Address, channel: u128) -> B256 {
    let mut preimage = [0u8; 36];
    preimage[..20].copy_from_slice(signer.as_slice());
    preimage[20..].copy_from_slice(&channel.to_be_bytes());
    keccak256(preimage)
}

impl KeyManagerState for Lsp6KeyManager {
    fn nonce(&self, signer: Address, channel: u128) -> u128 {
        self.nonces.get(nonce_slot(signer, channel)).saturating_to()
    }

    fn set_nonce(&mut self, signer: Address, channel: u128, counter: u128) {
        self.nonces.insert(nonce_slot(signer, channel), U256::from(counter));
    }

    fn reentrancy_status(&self) -> bool {
        self.reentrancy_active.get()
    }

    fn set_reentrancy_status(&mut self, active: bool) {
        self.reentrancy_active.set(active);
    }
}

#[public]
impl Lsp6KeyManager {
    #[constructor]
    pub fn constructor(&mut self, target: Address) {
        self.target.set(target);
    }

    pub fn target(&self) -> Address {
        self.target.get()
    }

    /// Next relay nonce of `from` on `channel_id`.
    pub fn get_nonce(&self, from: Address, channel_id: u128) -> U256 {
        compose_nonce(channel_id, self.nonce(from, channel_id))
    }

    /// ERC1271.
    pub fn is_valid_signature(&self, data_hash: FixedBytes<32>, signature: Bytes) -> FixedBytes<4> {
        let account = OnchainAccount::new(self.target.get(), READ_GAS);
        is_valid_signature(&account, data_hash, signature.as_slice())
    }

    #[payable]
    pub fn execute(&mut self, payload: Bytes) -> Result<Bytes, ContractError> {
        let outcome = self.with_key_manager(|km| km.execute(payload.as_slice()))?;
        self.emit_verified(core::slice::from_ref(&outcome));
        Ok(Bytes::from(outcome.return_data))
    }

    #[payable]
    pub fn execute_batch(&mut self, values: Vec<U256>, payloads: Vec<Bytes>) -> Result<Vec<Bytes>, ContractError> {
        let payloads: Vec<&[u8]> = payloads.iter().map(|payload| payload.as_slice()).collect();
        let outcomes = self.with_key_manager(|km| km.execute_batch(&values, &payloads))?;
        self.emit_verified(&outcomes);
        Ok(return_data(outcomes))
    }

    #[payable]
    pub fn execute_relay_call(
        &mut self,
        signature: Bytes,
        nonce: U256,
        validity_timestamps: U256,
        payload: Bytes,
    ) -> Result<Bytes, ContractError> {
        let outcome = self.with_key_manager(|km| {
            km.execute_relay_call(signature.as_slice(), nonce, validity_timestamps, payload.as_slice())
        })?;
        self.emit_verified(core::slice::from_ref(&outcome));
        Ok(Bytes::from(outcome.return_data))
    }

    #[payable]
    pub fn execute_relay_call_batch(
        &mut self,
        signatures: Vec<Bytes>,
        nonces: Vec<U256>,
        validity_timestamps: Vec<U256>,
        values: Vec<U256>,
        payloads: Vec<Bytes>,
    ) -> Result<Vec<Bytes>, ContractError> {
        let signatures: Vec<&[u8]> = signatures.iter().map(|signature| signature.as_slice()).collect();
        let payloads: Vec<&[u8]> = payloads.iter().map(|payload| payload.as_slice()).collect();
        let outcomes = self.with_key_manager(|km| {
            km.execute_relay_call_batch(&signatures, &nonces, &validity_timestamps, &values, &payloads)
        })?;
        self.emit_verified(&outcomes);
        Ok(return_data(outcomes))
    }

    /// LSP20: called by the account before running `call_data` for `caller`.
    pub fn lsp20_verify_call(
        &mut self,
        _requestor: Address,
        _target: Address,
        caller: Address,
        value: U256,
        call_data: Bytes,
    ) -> Result<FixedBytes<4>, ContractError> {
        self.with_key_manager(|km| km.lsp20_verify_call(caller, value, call_data.as_slice()))
    }

    /// LSP20: called by the account after the call it verified has run.
    pub fn lsp20_verify_call_result(
        &mut self,
        _call_hash: FixedBytes<32>,
        _call_result: Bytes,
    ) -> Result<FixedBytes<4>, ContractError> {
        self.with_key_manager(|km| km.lsp20_verify_call_result())
    }
}

impl Lsp6KeyManager {
    fn context(&self) -> ExecutionContext {
        ExecutionContext {
            chain_id: self.vm().chain_id(),
            key_manager: self.vm().contract_address(),
            timestamp: self.vm().block_timestamp(),
            caller: self.vm().msg_sender(),
            value: self.vm().msg_value(),
        }
    }

    fn with_key_manager<T>(
        &mut self,
        f: impl FnOnce(&mut KeyManager<'_, OnchainAccount, Self>) -> Result<T, KeyManagerError>,
    ) -> Result<T, ContractError> {
        let ctx = self.context();
        let mut account = OnchainAccount::new(self.target.get(), READ_GAS);
        let mut km = KeyManager::new(&mut account, self, ctx);
        f(&mut km).map_err(ContractError::from)
    }

    fn emit_verified(&self, outcomes: &[ExecutionOutcome]) {
        for outcome in outcomes {
            log(
                self.vm(),
                VerifiedCall {
                    signer: outcome.signer,
                    value: outcome.value,
                    selector: outcome.selector,
                },
            );
            if let Some(nonce) = outcome.nonce {
                log(
                    self.vm(),
                    RelayCallExecuted {
                        signer: outcome.signer,
                        nonce,
                    },
                );
            }
        }

        #[cfg(feature = "debug")]
        stylus_sdk::console!("lsp6: forwarded {} verified payload(s)", outcomes.len());
    }
}

fn return_data(outcomes: Vec<ExecutionOutcome>) -> Vec<Bytes> {
    outcomes
        .into_iter()
        .map(|outcome| Bytes::from(outcome.return_data))
        .collect()
}
