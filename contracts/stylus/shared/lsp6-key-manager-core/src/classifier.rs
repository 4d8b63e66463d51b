//! Payload decoding and classification into permission requirements.
//!
//! A payload is the ABI-encoded call the controller wants the account to run. Classification
//! turns each element of it (one data key write, one ERC725X call) into a [`Requirement`] the
//! verifier checks against the controller's mask and allow-lists.

use alloc::vec::Vec;

use alloy_primitives::{Address, FixedBytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    account::Erc725Account,
    allowed_calls::{decode_allowed_calls, CallRequest, CallTypes},
    allowed_keys::decode_allowed_data_keys,
    errors::KeyManagerError,
    interfaces::{IERC725X, IERC725Y, ILSP14Ownable2Step},
    keys::{decode_array_length, DataKey},
    permissions::Permissions,
    registry::PermissionRegistry,
};

/// ERC725X operation types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationType {
    Call,
    Create,
    Create2,
    StaticCall,
    DelegateCall,
}

impl TryFrom<U256> for OperationType {
    type Error = KeyManagerError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        let kind = match value.as_limbs() {
            [0, 0, 0, 0] => Self::Call,
            [1, 0, 0, 0] => Self::Create,
            [2, 0, 0, 0] => Self::Create2,
            [3, 0, 0, 0] => Self::StaticCall,
            [4, 0, 0, 0] => Self::DelegateCall,
            _ => return Err(KeyManagerError::InvalidOperationType(value)),
        };
        Ok(kind)
    }
}

/// One `execute` element of an ERC725X payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecuteCall {
    pub operation: OperationType,
    pub target: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

impl ExecuteCall {
    /// First four bytes of the calldata, zero-padded.
    pub fn selector(&self) -> FixedBytes<4> {
        let mut selector = [0u8; 4];
        let len = self.data.len().min(4);
        selector[..len].copy_from_slice(&self.data[..len]);
        FixedBytes(selector)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `setData` / `setDataBatch`.
    SetData(Vec<(B256, Vec<u8>)>),
    /// `execute` / `executeBatch`.
    Execute(Vec<ExecuteCall>),
    /// `transferOwnership` / `acceptOwnership` / `renounceOwnership`.
    ChangeOwner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPayload {
    pub selector: FixedBytes<4>,
    pub operation: Operation,
}

/// Call capability an ERC725X element exercises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    StaticCall,
    DelegateCall,
}

impl CallKind {
    pub fn permission(self) -> Permissions {
        match self {
            Self::Call => Permissions::CALL,
            Self::StaticCall => Permissions::STATICCALL,
            Self::DelegateCall => Permissions::DELEGATECALL,
        }
    }

    pub fn super_permission(self) -> Permissions {
        match self {
            Self::Call => Permissions::SUPER_CALL,
            Self::StaticCall => Permissions::SUPER_STATICCALL,
            Self::DelegateCall => Permissions::SUPER_DELEGATECALL,
        }
    }

    pub fn call_type(self) -> CallTypes {
        match self {
            Self::Call => CallTypes::CALL,
            Self::StaticCall => CallTypes::STATICCALL,
            Self::DelegateCall => CallTypes::DELEGATECALL,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::StaticCall => "STATICCALL",
            Self::DelegateCall => "DELEGATECALL",
        }
    }
}

/// What one element of a payload needs from the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// Bits checked on their own, no allow-list.
    Permissions(Permissions),
    /// A write to a key outside the reserved namespaces.
    SetData(B256),
    /// A call through the account, subject to the allowed calls.
    Call {
        target: Address,
        selector: FixedBytes<4>,
        kind: Option<CallKind>,
        transfers_value: bool,
    },
    /// CREATE / CREATE2.
    Deploy { funded: bool },
}

impl Requirement {
    /// Allow-list request for the parts of a call not covered by a SUPER permission.
    pub fn call_request(&self, permissions: Permissions) -> Option<CallRequest> {
        let Self::Call {
            target,
            selector,
            kind,
            transfers_value,
        } = self
        else {
            return None;
        };

        let mut call_types = CallTypes::NONE;
        if *transfers_value && !permissions.has(Permissions::SUPER_TRANSFERVALUE) {
            call_types = call_types | CallTypes::VALUE;
        }
        if let Some(kind) = kind {
            if !permissions.has(kind.super_permission()) {
                call_types = call_types | kind.call_type();
            }
        }
        (call_types != CallTypes::NONE).then_some(CallRequest {
            call_types,
            target: *target,
            selector: *selector,
        })
    }
}

fn decode<C: SolCall>(payload: &[u8]) -> Result<C, KeyManagerError> {
    C::abi_decode(payload, true).map_err(|_| KeyManagerError::InvalidPayload)
}

/// Decode an account payload into the operation it performs.
pub fn decode_payload(payload: &[u8]) -> Result<DecodedPayload, KeyManagerError> {
    let selector: [u8; 4] = payload
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(KeyManagerError::InvalidPayload)?;

    let operation = if selector == IERC725Y::setDataCall::SELECTOR {
        let call = decode::<IERC725Y::setDataCall>(payload)?;
        Operation::SetData(alloc::vec![(call.dataKey, call.dataValue.to_vec())])
    } else if selector == IERC725Y::setDataBatchCall::SELECTOR {
        let call = decode::<IERC725Y::setDataBatchCall>(payload)?;
        if call.dataKeys.len() != call.dataValues.len() {
            return Err(KeyManagerError::InvalidBatchLengths);
        }
        Operation::SetData(
            call.dataKeys
                .into_iter()
                .zip(call.dataValues)
                .map(|(key, value)| (key, value.to_vec()))
                .collect(),
        )
    } else if selector == IERC725X::executeCall::SELECTOR {
        let call = decode::<IERC725X::executeCall>(payload)?;
        Operation::Execute(alloc::vec![ExecuteCall {
            operation: OperationType::try_from(call.operationType)?,
            target: call.target,
            value: call.value,
            data: call.data.to_vec(),
        }])
    } else if selector == IERC725X::executeBatchCall::SELECTOR {
        let call = decode::<IERC725X::executeBatchCall>(payload)?;
        let len = call.operationsType.len();
        if call.targets.len() != len || call.values.len() != len || call.datas.len() != len {
            return Err(KeyManagerError::InvalidBatchLengths);
        }
        let mut calls = Vec::with_capacity(len);
        for i in 0..len {
            calls.push(ExecuteCall {
                operation: OperationType::try_from(call.operationsType[i])?,
                target: call.targets[i],
                value: call.values[i],
                data: call.datas[i].to_vec(),
            });
        }
        Operation::Execute(calls)
    } else if selector == ILSP14Ownable2Step::transferOwnershipCall::SELECTOR {
        decode::<ILSP14Ownable2Step::transferOwnershipCall>(payload)?;
        Operation::ChangeOwner
    } else if selector == ILSP14Ownable2Step::acceptOwnershipCall::SELECTOR
        || selector == ILSP14Ownable2Step::renounceOwnershipCall::SELECTOR
    {
        Operation::ChangeOwner
    } else {
        return Err(KeyManagerError::InvalidPayload);
    };

    Ok(DecodedPayload {
        selector: FixedBytes(selector),
        operation,
    })
}

fn add_or_change(prior: &[u8], add: Permissions, change: Permissions) -> Requirement {
    Requirement::Permissions(if prior.is_empty() { add } else { change })
}

/// Classify a data key write against the account's current values.
///
/// Malformed values for fixed-shape keys are rejected here, before any permission is looked at.
pub fn classify_data_key<A: Erc725Account>(
    registry: &PermissionRegistry<'_, A>,
    key: B256,
    value: &[u8],
) -> Result<Requirement, KeyManagerError> {
    let invalid = || KeyManagerError::InvalidDataValuesForDataKeys {
        key,
        value: value.to_vec(),
    };

    let requirement = match DataKey::parse(&key) {
        DataKey::PermissionsArrayLength => {
            let new_len = decode_array_length(value).ok_or_else(invalid)?;
            if new_len > registry.controllers_len()? {
                Requirement::Permissions(Permissions::ADDCONTROLLER)
            } else {
                Requirement::Permissions(Permissions::EDITPERMISSIONS)
            }
        }
        DataKey::PermissionsArrayElement(index) => {
            if !value.is_empty() && value.len() != 20 {
                return Err(invalid());
            }
            if index >= registry.controllers_len()? {
                Requirement::Permissions(Permissions::ADDCONTROLLER)
            } else {
                Requirement::Permissions(Permissions::EDITPERMISSIONS)
            }
        }
        DataKey::ControllerPermissions(controller) => {
            if !value.is_empty() && value.len() != 32 {
                return Err(invalid());
            }
            // A zeroed or wrongly sized value still counts as a new controller.
            if registry.permissions_of(controller)?.is_empty() {
                Requirement::Permissions(Permissions::ADDCONTROLLER)
            } else {
                Requirement::Permissions(Permissions::EDITPERMISSIONS)
            }
        }
        DataKey::AllowedCalls(_) => {
            decode_allowed_calls(value).map_err(|reason| {
                KeyManagerError::InvalidEncodedAllowedCalls {
                    value: value.to_vec(),
                    reason,
                }
            })?;
            add_or_change(
                &registry.read(key)?,
                Permissions::ADDCONTROLLER,
                Permissions::EDITPERMISSIONS,
            )
        }
        DataKey::AllowedDataKeys(_) => {
            decode_allowed_data_keys(value).map_err(|reason| {
                KeyManagerError::InvalidEncodedAllowedERC725YDataKeys {
                    value: value.to_vec(),
                    reason,
                }
            })?;
            add_or_change(
                &registry.read(key)?,
                Permissions::ADDCONTROLLER,
                Permissions::EDITPERMISSIONS,
            )
        }
        DataKey::UnrecognisedPermission => {
            return Err(KeyManagerError::NotRecognisedPermissionKey(key));
        }
        DataKey::UniversalReceiverDelegate => add_or_change(
            &registry.read(key)?,
            Permissions::ADDUNIVERSALRECEIVERDELEGATE,
            Permissions::CHANGEUNIVERSALRECEIVERDELEGATE,
        ),
        DataKey::Extension => add_or_change(
            &registry.read(key)?,
            Permissions::ADDEXTENSIONS,
            Permissions::CHANGEEXTENSIONS,
        ),
        DataKey::Generic => Requirement::SetData(key),
    };

    Ok(requirement)
}

/// Classify one ERC725X element.
pub fn classify_execute(call: &ExecuteCall) -> Requirement {
    let transfers_value = !call.value.is_zero();
    let kind = match call.operation {
        OperationType::Create | OperationType::Create2 => {
            return Requirement::Deploy {
                funded: transfers_value,
            };
        }
        // A bare value transfer only needs the value permission.
        OperationType::Call if transfers_value && call.data.is_empty() => None,
        OperationType::Call => Some(CallKind::Call),
        OperationType::StaticCall => Some(CallKind::StaticCall),
        OperationType::DelegateCall => Some(CallKind::DelegateCall),
    };

    Requirement::Call {
        target: call.target,
        selector: call.selector(),
        kind,
        transfers_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allowed_calls::{encode_allowed_calls, AllowedCall, ANY_STANDARD},
        codec::CodecError,
        keys::{
            allowed_calls_key, encode_array_length, extension_key, permissions_array_element_key,
            permissions_key, ADDRESS_PERMISSIONS_ARRAY, LSP1_UNIVERSAL_RECEIVER_DELEGATE,
        },
        registry::controller_setup,
        testing::MemoryAccount,
    };
    use alloc::vec;
    use alloy_primitives::{address, b256, fixed_bytes, Bytes};

    const ACCOUNT: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const ALICE: Address = address!("a11ce00000000000000000000000000000000000");
    const BOB: Address = address!("b0b0000000000000000000000000000000000000");
    const CAROL: Address = address!("ca201ca201ca201ca201ca201ca201ca201ca201");
    const DAVE: Address = address!("da7eda7eda7eda7eda7eda7eda7eda7eda7eda7e");
    const TARGET: Address = address!("1111111111111111111111111111111111111111");

    fn account_with_alice() -> MemoryAccount {
        let mut account = MemoryAccount::new(ACCOUNT);
        account.set_data_batch(controller_setup(0, ALICE, Permissions::SIGN, &[], &[]).unwrap());
        account
    }

    fn execute(operation: u64, value: u64, data: &[u8]) -> ExecuteCall {
        ExecuteCall {
            operation: OperationType::try_from(U256::from(operation)).unwrap(),
            target: TARGET,
            value: U256::from(value),
            data: data.to_vec(),
        }
    }

    #[test]
    fn decodes_set_data_batch() {
        let payload = IERC725Y::setDataBatchCall {
            dataKeys: vec![B256::repeat_byte(1), B256::repeat_byte(2)],
            dataValues: vec![Bytes::from(vec![0xaa]), Bytes::new()],
        }
        .abi_encode();
        let decoded = decode_payload(&payload).unwrap();
        assert_eq!(decoded.selector, IERC725Y::setDataBatchCall::SELECTOR);
        assert_eq!(
            decoded.operation,
            Operation::SetData(vec![
                (B256::repeat_byte(1), vec![0xaa]),
                (B256::repeat_byte(2), vec![])
            ])
        );
    }

    #[test]
    fn set_data_batch_lengths_must_match() {
        let payload = IERC725Y::setDataBatchCall {
            dataKeys: vec![B256::repeat_byte(1)],
            dataValues: vec![],
        }
        .abi_encode();
        assert_eq!(decode_payload(&payload), Err(KeyManagerError::InvalidBatchLengths));
    }

    #[test]
    fn decodes_execute_and_ownership() {
        let payload = IERC725X::executeCall {
            operationType: U256::from(3),
            target: TARGET,
            value: U256::ZERO,
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef, 0x01]),
        }
        .abi_encode();
        let decoded = decode_payload(&payload).unwrap();
        let Operation::Execute(calls) = decoded.operation else {
            panic!("expected execute");
        };
        assert_eq!(calls[0].operation, OperationType::StaticCall);
        assert_eq!(calls[0].selector(), fixed_bytes!("deadbeef"));

        let payload = ILSP14Ownable2Step::transferOwnershipCall { newOwner: BOB }.abi_encode();
        assert_eq!(decode_payload(&payload).unwrap().operation, Operation::ChangeOwner);
        let payload = ILSP14Ownable2Step::acceptOwnershipCall {}.abi_encode();
        assert_eq!(decode_payload(&payload).unwrap().operation, Operation::ChangeOwner);
    }

    #[test]
    fn rejects_unknown_and_short_payloads() {
        assert_eq!(decode_payload(&[0x44, 0xc0]), Err(KeyManagerError::InvalidPayload));
        assert_eq!(
            decode_payload(&[0xde, 0xad, 0xbe, 0xef]),
            Err(KeyManagerError::InvalidPayload)
        );
        // execute selector with truncated arguments
        let mut payload = IERC725X::executeCall {
            operationType: U256::ZERO,
            target: TARGET,
            value: U256::ZERO,
            data: Bytes::new(),
        }
        .abi_encode();
        payload.truncate(40);
        assert_eq!(decode_payload(&payload), Err(KeyManagerError::InvalidPayload));
    }

    #[test]
    fn rejects_unknown_operation_type() {
        let payload = IERC725X::executeCall {
            operationType: U256::from(5),
            target: TARGET,
            value: U256::ZERO,
            data: Bytes::new(),
        }
        .abi_encode();
        assert_eq!(
            decode_payload(&payload),
            Err(KeyManagerError::InvalidOperationType(U256::from(5)))
        );
    }

    #[test]
    fn execute_classification() {
        assert_eq!(
            classify_execute(&execute(0, 1, &[])),
            Requirement::Call {
                target: TARGET,
                selector: FixedBytes::ZERO,
                kind: None,
                transfers_value: true
            }
        );
        assert!(matches!(
            classify_execute(&execute(0, 1, &[0xaa, 0xbb, 0xcc, 0xdd])),
            Requirement::Call {
                kind: Some(CallKind::Call),
                transfers_value: true,
                ..
            }
        ));
        assert!(matches!(
            classify_execute(&execute(4, 0, &[])),
            Requirement::Call {
                kind: Some(CallKind::DelegateCall),
                transfers_value: false,
                ..
            }
        ));
        assert_eq!(
            classify_execute(&execute(2, 5, &[0x60])),
            Requirement::Deploy { funded: true }
        );
    }

    #[test]
    fn super_permissions_drop_call_types_from_request() {
        let requirement = classify_execute(&execute(0, 1, &[0xaa, 0xbb, 0xcc, 0xdd]));
        let request = requirement.call_request(Permissions::CALL).unwrap();
        assert_eq!(request.call_types, CallTypes::CALL | CallTypes::VALUE);

        let request = requirement
            .call_request(Permissions::SUPER_TRANSFERVALUE | Permissions::CALL)
            .unwrap();
        assert_eq!(request.call_types, CallTypes::CALL);

        assert_eq!(
            requirement.call_request(Permissions::SUPER_TRANSFERVALUE | Permissions::SUPER_CALL),
            None
        );
    }

    #[test]
    fn permissions_key_add_vs_edit() {
        let account = account_with_alice();
        let registry = PermissionRegistry::new(&account);
        let word = Permissions::CALL.to_word();

        assert_eq!(
            classify_data_key(&registry, permissions_key(BOB), word.as_slice()).unwrap(),
            Requirement::Permissions(Permissions::ADDCONTROLLER)
        );
        assert_eq!(
            classify_data_key(&registry, permissions_key(ALICE), word.as_slice()).unwrap(),
            Requirement::Permissions(Permissions::EDITPERMISSIONS)
        );
        assert_eq!(
            classify_data_key(&registry, permissions_key(ALICE), &[]).unwrap(),
            Requirement::Permissions(Permissions::EDITPERMISSIONS)
        );
    }

    #[test]
    fn zeroed_or_missized_permissions_value_counts_as_new_controller() {
        let mut account = MemoryAccount::new(ACCOUNT);
        account.set_data(permissions_key(BOB), vec![0u8; 32]);
        account.set_data(permissions_key(CAROL), vec![0xaa; 16]);
        account.set_data(permissions_key(DAVE), vec![0xaa; 40]);
        let registry = PermissionRegistry::new(&account);
        let word = Permissions::SIGN.to_word();
        for controller in [BOB, CAROL, DAVE] {
            assert_eq!(
                classify_data_key(&registry, permissions_key(controller), word.as_slice()).unwrap(),
                Requirement::Permissions(Permissions::ADDCONTROLLER)
            );
        }
    }

    #[test]
    fn fixed_shape_values_are_validated() {
        let account = account_with_alice();
        let registry = PermissionRegistry::new(&account);
        assert!(matches!(
            classify_data_key(&registry, permissions_key(BOB), &[0x01; 31]),
            Err(KeyManagerError::InvalidDataValuesForDataKeys { .. })
        ));
        assert!(matches!(
            classify_data_key(&registry, ADDRESS_PERMISSIONS_ARRAY, &[0x01; 32]),
            Err(KeyManagerError::InvalidDataValuesForDataKeys { .. })
        ));
        assert!(matches!(
            classify_data_key(&registry, permissions_array_element_key(1), &[0x01; 19]),
            Err(KeyManagerError::InvalidDataValuesForDataKeys { .. })
        ));
        assert_eq!(
            classify_data_key(&registry, allowed_calls_key(BOB), &[0x00, 0x04, 0x01]),
            Err(KeyManagerError::InvalidEncodedAllowedCalls {
                value: vec![0x00, 0x04, 0x01],
                reason: CodecError::Overrun {
                    offset: 0,
                    declared: 4,
                    remaining: 1
                },
            })
        );
    }

    #[test]
    fn array_length_and_elements() {
        let account = account_with_alice();
        let registry = PermissionRegistry::new(&account);
        assert_eq!(
            classify_data_key(&registry, ADDRESS_PERMISSIONS_ARRAY, &encode_array_length(2)).unwrap(),
            Requirement::Permissions(Permissions::ADDCONTROLLER)
        );
        assert_eq!(
            classify_data_key(&registry, ADDRESS_PERMISSIONS_ARRAY, &encode_array_length(0)).unwrap(),
            Requirement::Permissions(Permissions::EDITPERMISSIONS)
        );
        assert_eq!(
            classify_data_key(&registry, permissions_array_element_key(1), BOB.as_slice()).unwrap(),
            Requirement::Permissions(Permissions::ADDCONTROLLER)
        );
        assert_eq!(
            classify_data_key(&registry, permissions_array_element_key(0), BOB.as_slice()).unwrap(),
            Requirement::Permissions(Permissions::EDITPERMISSIONS)
        );
    }

    #[test]
    fn allowed_calls_key_add_vs_edit() {
        let mut account = account_with_alice();
        let entry = AllowedCall {
            call_types: CallTypes::CALL,
            target: TARGET,
            standard: ANY_STANDARD,
            selector: fixed_bytes!("a9059cbb"),
        };
        let value = encode_allowed_calls(&[entry]).unwrap();
        account.set_data(allowed_calls_key(ALICE), value.clone());
        let registry = PermissionRegistry::new(&account);

        assert_eq!(
            classify_data_key(&registry, allowed_calls_key(BOB), &value).unwrap(),
            Requirement::Permissions(Permissions::ADDCONTROLLER)
        );
        assert_eq!(
            classify_data_key(&registry, allowed_calls_key(ALICE), &value).unwrap(),
            Requirement::Permissions(Permissions::EDITPERMISSIONS)
        );
    }

    #[test]
    fn delegate_and_extension_keys() {
        let mut account = MemoryAccount::new(ACCOUNT);
        let registry = PermissionRegistry::new(&account);
        assert_eq!(
            classify_data_key(&registry, LSP1_UNIVERSAL_RECEIVER_DELEGATE, BOB.as_slice()).unwrap(),
            Requirement::Permissions(Permissions::ADDUNIVERSALRECEIVERDELEGATE)
        );
        let ext = extension_key(fixed_bytes!("12345678"));
        assert_eq!(
            classify_data_key(&registry, ext, BOB.as_slice()).unwrap(),
            Requirement::Permissions(Permissions::ADDEXTENSIONS)
        );

        account.set_data(LSP1_UNIVERSAL_RECEIVER_DELEGATE, BOB.to_vec());
        account.set_data(ext, BOB.to_vec());
        let registry = PermissionRegistry::new(&account);
        assert_eq!(
            classify_data_key(&registry, LSP1_UNIVERSAL_RECEIVER_DELEGATE, &[]).unwrap(),
            Requirement::Permissions(Permissions::CHANGEUNIVERSALRECEIVERDELEGATE)
        );
        assert_eq!(
            classify_data_key(&registry, ext, &[]).unwrap(),
            Requirement::Permissions(Permissions::CHANGEEXTENSIONS)
        );
    }

    #[test]
    fn unknown_permission_sub_key_and_generic_keys() {
        let account = MemoryAccount::new(ACCOUNT);
        let registry = PermissionRegistry::new(&account);
        let odd = b256!("4b80742de2bf1234000000000000000000000000000000000000000000000000");
        assert_eq!(
            classify_data_key(&registry, odd, &[]),
            Err(KeyManagerError::NotRecognisedPermissionKey(odd))
        );
        let generic = B256::repeat_byte(0x42);
        assert_eq!(
            classify_data_key(&registry, generic, &[0x01]).unwrap(),
            Requirement::SetData(generic)
        );
    }
}
