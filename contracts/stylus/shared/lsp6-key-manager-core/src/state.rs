use alloy_primitives::Address;

/// Mutable state owned by the key manager itself (not by the account).
pub trait KeyManagerState {
    /// Current counter of the relay nonce channel `channel` for `signer`.
    fn nonce(&self, signer: Address, channel: u128) -> u128;

    fn set_nonce(&mut self, signer: Address, channel: u128, counter: u128);

    /// True while a verified execution is forwarding to the account.
    fn reentrancy_status(&self) -> bool;

    fn set_reentrancy_status(&mut self, active: bool);
}
