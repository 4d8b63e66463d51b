//! Solidity errors raised by the key manager.

use alloc::{string::String, vec::Vec};

use alloy_sol_types::{sol, SolError};
use stylus_sdk::alloy_primitives::Bytes;

use lsp6_key_manager_core::{codec::CodecError, AccountError, KeyManagerError};

sol! {
    error NotAuthorised(address from, string permission);
    error NoPermissionsSet(address from);
    error NotRecognisedPermissionKey(bytes32 dataKey);
    error InvalidDataValuesForDataKeys(bytes32 dataKey, bytes dataValue);
    error InvalidEncodedAllowedCalls(bytes allowedCallsValue, string context);
    error InvalidEncodedAllowedERC725YDataKeys(bytes value, string context);
    error NoCallsAllowed(address from);
    error NoERC725YDataKeysAllowed(address from);
    error InvalidWhitelistedCall(address from);
    error InvalidRelayNonce(address signer, uint256 invalidNonce, bytes signature);
    error InvalidPayload();
    error InvalidOperationType(uint256 operationType);
    error CannotSendValueToSetData();
    error CallingKeyManagerNotAllowed();
    error BatchExecuteParamsLengthMismatch();
    error LSP6BatchInsufficientValueSent(uint256 totalValues, uint256 msgValue);
    error LSP6BatchExcessiveValueSent(uint256 totalValues, uint256 msgValue);
    error RelayCallBeforeStartTime();
    error RelayCallExpired();
    error InvalidRelaySignature();
    error CallerIsNotTheTarget(address caller);
    error AccountReturnMalformed();
}

/// Revert payload of a failed key manager call.
///
/// A revert from the account (or from a call target through it) is bubbled up unchanged.
#[derive(Debug)]
pub struct ContractError(pub KeyManagerError);

impl From<KeyManagerError> for ContractError {
    fn from(err: KeyManagerError) -> Self {
        Self(err)
    }
}

fn codec_context(reason: &CodecError) -> String {
    let context = match reason {
        CodecError::TruncatedLength { .. } => "truncated length prefix",
        CodecError::ZeroLengthElement { .. } => "zero length element",
        CodecError::Overrun { .. } => "element overruns value",
        CodecError::InvalidElementLength { .. } => "invalid element length",
        CodecError::ElementTooLong(_) => "element too long",
    };
    String::from(context)
}

impl From<ContractError> for Vec<u8> {
    fn from(err: ContractError) -> Vec<u8> {
        use KeyManagerError as E;

        match err.0 {
            E::NotAuthorised {
                controller,
                permission,
            } => NotAuthorised {
                from: controller,
                permission: String::from(permission),
            }
            .abi_encode(),
            E::NoPermissionsSet(from) => NoPermissionsSet { from }.abi_encode(),
            E::NotRecognisedPermissionKey(data_key) => NotRecognisedPermissionKey { dataKey: data_key }.abi_encode(),
            E::InvalidDataValuesForDataKeys { key, value } => InvalidDataValuesForDataKeys {
                dataKey: key,
                dataValue: Bytes::from(value),
            }
            .abi_encode(),
            E::InvalidEncodedAllowedCalls { value, reason } => InvalidEncodedAllowedCalls {
                allowedCallsValue: Bytes::from(value),
                context: codec_context(&reason),
            }
            .abi_encode(),
            E::InvalidEncodedAllowedERC725YDataKeys { value, reason } => InvalidEncodedAllowedERC725YDataKeys {
                value: Bytes::from(value),
                context: codec_context(&reason),
            }
            .abi_encode(),
            E::NoCallsAllowed(from) => NoCallsAllowed { from }.abi_encode(),
            E::NoERC725YDataKeysAllowed(from) => NoERC725YDataKeysAllowed { from }.abi_encode(),
            E::InvalidWhitelistedCall(from) => InvalidWhitelistedCall { from }.abi_encode(),
            E::InvalidRelayNonce {
                signer,
                nonce,
                signature,
            } => InvalidRelayNonce {
                signer,
                invalidNonce: nonce,
                signature: Bytes::from(signature),
            }
            .abi_encode(),
            E::InvalidPayload => InvalidPayload {}.abi_encode(),
            E::InvalidOperationType(operation_type) => InvalidOperationType {
                operationType: operation_type,
            }
            .abi_encode(),
            E::CannotSendValueToSetData => CannotSendValueToSetData {}.abi_encode(),
            E::ReentrancyNotPermitted => CallingKeyManagerNotAllowed {}.abi_encode(),
            E::InvalidBatchLengths => BatchExecuteParamsLengthMismatch {}.abi_encode(),
            E::BatchInsufficientValueSent { total, sent } => LSP6BatchInsufficientValueSent {
                totalValues: total,
                msgValue: sent,
            }
            .abi_encode(),
            E::BatchExcessiveValueSent { total, sent } => LSP6BatchExcessiveValueSent {
                totalValues: total,
                msgValue: sent,
            }
            .abi_encode(),
            E::RelayCallBeforeStartTime => RelayCallBeforeStartTime {}.abi_encode(),
            E::RelayCallExpired => RelayCallExpired {}.abi_encode(),
            E::InvalidSignature => InvalidRelaySignature {}.abi_encode(),
            E::CallerIsNotTheTarget(caller) => CallerIsNotTheTarget { caller }.abi_encode(),
            E::Account(AccountError::Reverted(data)) => data,
            E::Account(AccountError::MalformedReturn) => AccountReturnMalformed {}.abi_encode(),
        }
    }
}
