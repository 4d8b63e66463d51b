//! The linked ERC725 account, reached through raw EVM calls.

use alloc::vec::Vec;

use alloy_sol_types::SolCall;
use stylus_sdk::{
    alloy_primitives::{Address, FixedBytes, B256, U256},
    call::RawCall,
};

use lsp6_key_manager_core::{
    interfaces::{IERC165, IERC725Y},
    AccountError, Erc725Account,
};

/// ERC165 caps `supportsInterface` at 30k gas.
const SUPPORTS_INTERFACE_GAS: u64 = 30_000;

pub struct OnchainAccount {
    address: Address,
    /// Gas cap for `getData` reads.
    read_gas: u64,
}

impl OnchainAccount {
    pub fn new(address: Address, read_gas: u64) -> Self {
        Self { address, read_gas }
    }

    fn staticcall(&self, target: Address, gas: u64, data: &[u8]) -> Result<Vec<u8>, AccountError> {
        unsafe { RawCall::new_static().gas(gas).call(target, data) }.map_err(AccountError::Reverted)
    }
}

impl Erc725Account for OnchainAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn get_data(&self, key: B256) -> Result<Vec<u8>, AccountError> {
        let data = IERC725Y::getDataCall { dataKey: key }.abi_encode();
        let out = self.staticcall(self.address, self.read_gas, &data)?;
        let decoded =
            IERC725Y::getDataCall::abi_decode_returns(&out, true).map_err(|_| AccountError::MalformedReturn)?;
        Ok(decoded.dataValue.to_vec())
    }

    fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool {
        let data = IERC165::supportsInterfaceCall {
            interfaceId: interface_id,
        }
        .abi_encode();
        match self.staticcall(target, SUPPORTS_INTERFACE_GAS, &data) {
            Ok(out) => IERC165::supportsInterfaceCall::abi_decode_returns(&out, true)
                .map(|ret| ret._0)
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    fn forward(&mut self, value: U256, payload: &[u8]) -> Result<Vec<u8>, AccountError> {
        // The account may call back into this contract (LSP20, nested execution). The reentrancy
        // flag and consumed nonces must be in storage before it does, and whatever the nested
        // frame writes must be re-read afterwards.
        unsafe {
            RawCall::new_with_value(value)
                .flush_storage_cache()
                .clear_storage_cache()
                .call(self.address, payload)
        }
        .map_err(AccountError::Reverted)
    }
}
