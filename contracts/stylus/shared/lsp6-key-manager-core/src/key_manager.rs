//! Entry points of a key manager: direct execution, batches, relay calls, ERC1271 and LSP20.
//!
//! Every entry point verifies the whole request before anything is forwarded to the account.

use alloc::vec::Vec;

use alloy_primitives::{Address, FixedBytes, B256, U256};

use crate::{
    account::Erc725Account,
    crypto::recover_signer,
    errors::KeyManagerError,
    guard::{self, ReentrancyGuard},
    interfaces::{
        ERC1271_FAIL_VALUE, ERC1271_MAGIC_VALUE, LSP20_VERIFY_CALL_RESULT_MAGIC_VALUE,
        LSP20_VERIFY_CALL_WITHOUT_POST_VERIFICATION, LSP20_VERIFY_CALL_WITH_POST_VERIFICATION,
    },
    permissions::Permissions,
    registry::PermissionRegistry,
    relay::{check_validity_timestamps, compose_nonce, consume_nonce, relay_call_digest, relay_message},
    state::KeyManagerState,
    verifier::Verifier,
};

/// Environment of one call into the key manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub chain_id: u64,
    /// Address of the key manager itself; relay digests are bound to it.
    pub key_manager: Address,
    pub timestamp: u64,
    /// Direct caller (`msg.sender`).
    pub caller: Address,
    /// Value sent with the call (`msg.value`).
    pub value: U256,
}

/// One payload that was verified and forwarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub signer: Address,
    pub value: U256,
    pub selector: FixedBytes<4>,
    /// Relay nonce consumed for this payload, if relayed.
    pub nonce: Option<U256>,
    pub return_data: Vec<u8>,
}

struct Verified<'p> {
    signer: Address,
    value: U256,
    selector: FixedBytes<4>,
    nonce: Option<U256>,
    payload: &'p [u8],
}

pub struct KeyManager<'a, A: Erc725Account, S: KeyManagerState> {
    account: &'a mut A,
    state: &'a mut S,
    ctx: ExecutionContext,
}

fn check_batch_value(values: &[U256], sent: U256) -> Result<(), KeyManagerError> {
    let total = values
        .iter()
        .fold(U256::ZERO, |acc, value| acc.saturating_add(*value));
    if total > sent {
        return Err(KeyManagerError::BatchInsufficientValueSent { total, sent });
    }
    if total < sent {
        return Err(KeyManagerError::BatchExcessiveValueSent { total, sent });
    }
    Ok(())
}

/// ERC1271 against `account`: valid when the recovered signer holds SIGN. Never fails.
pub fn is_valid_signature<A: Erc725Account>(account: &A, hash: B256, signature: &[u8]) -> FixedBytes<4> {
    let Ok(signer) = recover_signer(hash, signature) else {
        return ERC1271_FAIL_VALUE;
    };
    match PermissionRegistry::new(account).permissions_of(signer) {
        Ok(permissions) if permissions.has(Permissions::SIGN) => ERC1271_MAGIC_VALUE,
        _ => ERC1271_FAIL_VALUE,
    }
}

impl<'a, A: Erc725Account, S: KeyManagerState> KeyManager<'a, A, S> {
    pub fn new(account: &'a mut A, state: &'a mut S, ctx: ExecutionContext) -> Self {
        Self {
            account,
            state,
            ctx,
        }
    }

    /// The account this key manager controls.
    pub fn target(&self) -> Address {
        self.account.address()
    }

    pub fn get_nonce(&self, signer: Address, channel: u128) -> U256 {
        compose_nonce(channel, self.state.nonce(signer, channel))
    }

    pub fn is_valid_signature(&self, hash: B256, signature: &[u8]) -> FixedBytes<4> {
        is_valid_signature(&*self.account, hash, signature)
    }

    /// Run `payload` on the account on behalf of the direct caller.
    pub fn execute(&mut self, payload: &[u8]) -> Result<ExecutionOutcome, KeyManagerError> {
        let (caller, value) = (self.ctx.caller, self.ctx.value);
        let nested = self.state.reentrancy_status();
        let selector = self.verify_one(caller, value, payload, nested)?;

        let verified = Verified {
            signer: caller,
            value,
            selector,
            nonce: None,
            payload,
        };
        let mut outcomes = self.dispatch(alloc::vec![verified])?;
        outcomes.pop().ok_or(KeyManagerError::InvalidPayload)
    }

    /// Run several payloads, each with its own share of the sent value.
    pub fn execute_batch<P: AsRef<[u8]>>(
        &mut self,
        values: &[U256],
        payloads: &[P],
    ) -> Result<Vec<ExecutionOutcome>, KeyManagerError> {
        if values.len() != payloads.len() {
            return Err(KeyManagerError::InvalidBatchLengths);
        }
        check_batch_value(values, self.ctx.value)?;

        let caller = self.ctx.caller;
        let requests: Vec<(U256, &[u8])> = values
            .iter()
            .zip(payloads)
            .map(|(value, payload)| (*value, payload.as_ref()))
            .collect();
        let nested = self.state.reentrancy_status();
        let selectors = self.verify(caller, &requests, nested)?;

        let verified = requests
            .iter()
            .zip(selectors)
            .map(|((value, payload), selector)| Verified {
                signer: caller,
                value: *value,
                selector,
                nonce: None,
                payload: *payload,
            })
            .collect();
        self.dispatch(verified)
    }

    /// Run a payload signed off-chain by a controller. The sent value is part of the signed message.
    pub fn execute_relay_call(
        &mut self,
        signature: &[u8],
        nonce: U256,
        validity_timestamps: U256,
        payload: &[u8],
    ) -> Result<ExecutionOutcome, KeyManagerError> {
        let nested = self.state.reentrancy_status();
        let verified =
            self.verify_relay_call(signature, nonce, validity_timestamps, self.ctx.value, payload, nested)?;
        let mut outcomes = self.dispatch(alloc::vec![verified])?;
        outcomes.pop().ok_or(KeyManagerError::InvalidPayload)
    }

    pub fn execute_relay_call_batch<G: AsRef<[u8]>, P: AsRef<[u8]>>(
        &mut self,
        signatures: &[G],
        nonces: &[U256],
        validity_timestamps: &[U256],
        values: &[U256],
        payloads: &[P],
    ) -> Result<Vec<ExecutionOutcome>, KeyManagerError> {
        let len = signatures.len();
        if nonces.len() != len
            || validity_timestamps.len() != len
            || values.len() != len
            || payloads.len() != len
        {
            return Err(KeyManagerError::InvalidBatchLengths);
        }
        check_batch_value(values, self.ctx.value)?;

        let nested = self.state.reentrancy_status();
        let mut verified = Vec::with_capacity(len);
        for i in 0..len {
            verified.push(self.verify_relay_call(
                signatures[i].as_ref(),
                nonces[i],
                validity_timestamps[i],
                values[i],
                payloads[i].as_ref(),
                nested,
            )?);
        }
        self.dispatch(verified)
    }

    /// LSP20: the account asks whether `caller` may run `call_data` on it directly.
    ///
    /// A top-level call takes the reentrancy flag and asks for post-verification, which releases it.
    pub fn lsp20_verify_call(
        &mut self,
        caller: Address,
        value: U256,
        call_data: &[u8],
    ) -> Result<FixedBytes<4>, KeyManagerError> {
        self.only_target()?;
        let nested = self.state.reentrancy_status();
        self.verify_one(caller, value, call_data, nested)?;

        if nested {
            return Ok(LSP20_VERIFY_CALL_WITHOUT_POST_VERIFICATION);
        }
        guard::acquire(&mut *self.state);
        Ok(LSP20_VERIFY_CALL_WITH_POST_VERIFICATION)
    }

    pub fn lsp20_verify_call_result(&mut self) -> Result<FixedBytes<4>, KeyManagerError> {
        self.only_target()?;
        guard::release(&mut *self.state);
        Ok(LSP20_VERIFY_CALL_RESULT_MAGIC_VALUE)
    }

    fn only_target(&self) -> Result<(), KeyManagerError> {
        if self.ctx.caller != self.account.address() {
            return Err(KeyManagerError::CallerIsNotTheTarget(self.ctx.caller));
        }
        Ok(())
    }

    fn verify<P: AsRef<[u8]>>(
        &self,
        controller: Address,
        requests: &[(U256, P)],
        nested: bool,
    ) -> Result<Vec<FixedBytes<4>>, KeyManagerError> {
        let registry = PermissionRegistry::new(&*self.account);
        Verifier::new(&registry, self.ctx.key_manager).verify(controller, requests, nested)
    }

    fn verify_one(
        &self,
        controller: Address,
        value: U256,
        payload: &[u8],
        nested: bool,
    ) -> Result<FixedBytes<4>, KeyManagerError> {
        self.verify(controller, &[(value, payload)], nested)?
            .first()
            .copied()
            .ok_or(KeyManagerError::InvalidPayload)
    }

    /// Recover the signer, consume the nonce, check the validity window, then verify.
    ///
    /// The nonce stays consumed when a later check rejects the call.
    fn verify_relay_call<'p>(
        &mut self,
        signature: &[u8],
        nonce: U256,
        validity_timestamps: U256,
        value: U256,
        payload: &'p [u8],
        nested: bool,
    ) -> Result<Verified<'p>, KeyManagerError> {
        let message = relay_message(self.ctx.chain_id, nonce, validity_timestamps, value, payload);
        let digest = relay_call_digest(self.ctx.key_manager, &message);
        let signer = recover_signer(digest, signature)?;

        consume_nonce(&mut *self.state, signer, nonce, signature)?;
        check_validity_timestamps(validity_timestamps, self.ctx.timestamp)?;

        let selector = self.verify_one(signer, value, payload, nested)?;
        Ok(Verified {
            signer,
            value,
            selector,
            nonce: Some(nonce),
            payload,
        })
    }

    /// Forward verified payloads in order while holding the reentrancy flag.
    fn dispatch(&mut self, verified: Vec<Verified<'_>>) -> Result<Vec<ExecutionOutcome>, KeyManagerError> {
        let _guard = ReentrancyGuard::enter(&mut *self.state);

        let mut outcomes = Vec::with_capacity(verified.len());
        for call in verified {
            let return_data = self.account.forward(call.value, call.payload)?;
            outcomes.push(ExecutionOutcome {
                signer: call.signer,
                value: call.value,
                selector: call.selector,
                nonce: call.nonce,
                return_data,
            });
        }
        Ok(outcomes)
    }
}
