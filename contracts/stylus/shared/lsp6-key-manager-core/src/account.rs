use alloc::vec::Vec;

use alloy_primitives::{Address, FixedBytes, B256, U256};

use crate::errors::AccountError;

/// The ERC725 account a key manager controls, implemented differently on-chain vs off-chain.
pub trait Erc725Account {
    /// Address of the account itself.
    fn address(&self) -> Address;

    /// `getData(bytes32)`; an unset key reads as an empty value.
    fn get_data(&self, key: B256) -> Result<Vec<u8>, AccountError>;

    /// ERC165 `supportsInterface` on an arbitrary call target.
    ///
    /// A target that reverts or returns garbage does not support the interface.
    fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool;

    /// Run a verified payload on the account with `value` attached.
    fn forward(&mut self, value: U256, payload: &[u8]) -> Result<Vec<u8>, AccountError>;
}
