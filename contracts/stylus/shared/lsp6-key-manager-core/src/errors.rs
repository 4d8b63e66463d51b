use alloc::vec::Vec;

use alloy_primitives::{Address, B256, U256};

use crate::codec::CodecError;

/// Failure talking to the linked ERC725 account (or a call target through it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// The call reverted; carries the callee's revert data.
    Reverted(Vec<u8>),
    /// Return data could not be decoded.
    MalformedReturn,
}

/// Reasons a key manager rejects a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyManagerError {
    NotAuthorised {
        controller: Address,
        permission: &'static str,
    },
    NoPermissionsSet(Address),
    NotRecognisedPermissionKey(B256),
    InvalidDataValuesForDataKeys {
        key: B256,
        value: Vec<u8>,
    },
    InvalidEncodedAllowedCalls {
        value: Vec<u8>,
        reason: CodecError,
    },
    InvalidEncodedAllowedERC725YDataKeys {
        value: Vec<u8>,
        reason: CodecError,
    },
    NoCallsAllowed(Address),
    NoERC725YDataKeysAllowed(Address),
    InvalidWhitelistedCall(Address),
    InvalidRelayNonce {
        signer: Address,
        nonce: U256,
        signature: Vec<u8>,
    },
    InvalidPayload,
    InvalidOperationType(U256),
    CannotSendValueToSetData,
    ReentrancyNotPermitted,
    InvalidBatchLengths,
    BatchInsufficientValueSent {
        total: U256,
        sent: U256,
    },
    BatchExcessiveValueSent {
        total: U256,
        sent: U256,
    },
    RelayCallBeforeStartTime,
    RelayCallExpired,
    InvalidSignature,
    CallerIsNotTheTarget(Address),
    Account(AccountError),
}

impl KeyManagerError {
    pub fn not_authorised(controller: Address, permission: &'static str) -> Self {
        Self::NotAuthorised {
            controller,
            permission,
        }
    }
}

impl From<AccountError> for KeyManagerError {
    fn from(err: AccountError) -> Self {
        Self::Account(err)
    }
}
