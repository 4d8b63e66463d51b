//! Permission verification of a controller's request.
//!
//! Order of checks for a request (one or more payloads):
//! 1. nested execution needs REENTRANCY
//! 2. the controller must hold some permission
//! 3. every payload element is decoded and classified (malformed input fails here)
//! 4. capability bits for every element
//! 5. allow-lists for every element not covered by a SUPER permission

use alloc::vec::Vec;

use alloy_primitives::{Address, FixedBytes, B256, U256};

use crate::{
    account::Erc725Account,
    allowed_calls::{AllowedCall, CallRequest},
    allowed_keys::is_allowed_data_key,
    classifier::{classify_data_key, classify_execute, decode_payload, Operation, Requirement},
    errors::KeyManagerError,
    permissions::Permissions,
    registry::PermissionRegistry,
};

pub struct Verifier<'r, 'a, A: Erc725Account> {
    registry: &'r PermissionRegistry<'a, A>,
    key_manager: Address,
}

/// Allow-lists of the controller under verification, read on first use.
#[derive(Default)]
struct AllowLists {
    calls: Option<Vec<AllowedCall>>,
    data_keys: Option<Vec<Vec<u8>>>,
}

impl<'r, 'a, A: Erc725Account> Verifier<'r, 'a, A> {
    pub fn new(registry: &'r PermissionRegistry<'a, A>, key_manager: Address) -> Self {
        Self {
            registry,
            key_manager,
        }
    }

    /// Verify that `controller` may run every `(value, payload)` pair.
    ///
    /// Returns the selector of each payload, in order.
    pub fn verify<P: AsRef<[u8]>>(
        &self,
        controller: Address,
        requests: &[(U256, P)],
        nested: bool,
    ) -> Result<Vec<FixedBytes<4>>, KeyManagerError> {
        let permissions = self.registry.permissions_of(controller)?;

        if nested && !permissions.has(Permissions::REENTRANCY) {
            return Err(KeyManagerError::not_authorised(controller, "REENTRANCY"));
        }
        if permissions.is_empty() {
            return Err(KeyManagerError::NoPermissionsSet(controller));
        }

        let mut selectors = Vec::with_capacity(requests.len());
        let mut requirements = Vec::new();
        for (value, payload) in requests {
            let decoded = decode_payload(payload.as_ref())?;
            self.classify(&decoded.operation, *value, &mut requirements)?;
            selectors.push(decoded.selector);
        }

        for requirement in &requirements {
            check_bits(controller, permissions, requirement)?;
        }

        let mut lists = AllowLists::default();
        for requirement in &requirements {
            self.check_allow_lists(controller, permissions, requirement, &mut lists)?;
        }

        Ok(selectors)
    }

    fn classify(
        &self,
        operation: &Operation,
        value: U256,
        out: &mut Vec<Requirement>,
    ) -> Result<(), KeyManagerError> {
        match operation {
            Operation::SetData(entries) => {
                if !value.is_zero() {
                    return Err(KeyManagerError::CannotSendValueToSetData);
                }
                for (key, value) in entries {
                    out.push(classify_data_key(self.registry, *key, value)?);
                }
            }
            Operation::Execute(calls) => {
                for call in calls {
                    if call.target == self.key_manager {
                        return Err(KeyManagerError::ReentrancyNotPermitted);
                    }
                    out.push(classify_execute(call));
                }
            }
            Operation::ChangeOwner => out.push(Requirement::Permissions(Permissions::CHANGEOWNER)),
        }
        Ok(())
    }

    fn check_allow_lists(
        &self,
        controller: Address,
        permissions: Permissions,
        requirement: &Requirement,
        lists: &mut AllowLists,
    ) -> Result<(), KeyManagerError> {
        match requirement {
            Requirement::SetData(key) if !permissions.has(Permissions::SUPER_SETDATA) => {
                if lists.data_keys.is_none() {
                    lists.data_keys = Some(
                        self.registry
                            .allowed_data_keys_of(controller)?
                            .unwrap_or_default(),
                    );
                }
                let prefixes = lists.data_keys.as_deref().unwrap_or_default();
                self.check_data_key(controller, prefixes, key)
            }
            Requirement::Call { kind, .. } => {
                let Some(request) = requirement.call_request(permissions) else {
                    return Ok(());
                };
                if lists.calls.is_none() {
                    lists.calls = Some(
                        self.registry
                            .allowed_calls_of(controller)?
                            .unwrap_or_default(),
                    );
                }
                let allowed = lists.calls.as_deref().unwrap_or_default();
                let denied = kind.map_or("TRANSFERVALUE", |kind| kind.name());
                self.check_call(controller, allowed, &request, denied)
            }
            _ => Ok(()),
        }
    }

    fn check_data_key(
        &self,
        controller: Address,
        prefixes: &[Vec<u8>],
        key: &B256,
    ) -> Result<(), KeyManagerError> {
        if prefixes.is_empty() {
            return Err(KeyManagerError::NoERC725YDataKeysAllowed(controller));
        }
        if prefixes.iter().any(|prefix| is_allowed_data_key(prefix, key)) {
            return Ok(());
        }
        Err(KeyManagerError::not_authorised(controller, "SETDATA"))
    }

    fn check_call(
        &self,
        controller: Address,
        allowed: &[AllowedCall],
        request: &CallRequest,
        denied: &'static str,
    ) -> Result<(), KeyManagerError> {
        if allowed.is_empty() {
            return Err(KeyManagerError::NoCallsAllowed(controller));
        }
        let account = self.registry.account();
        for entry in allowed {
            if entry.is_unrestricted() {
                return Err(KeyManagerError::InvalidWhitelistedCall(controller));
            }
            if entry.matches(request, |target, id| account.supports_interface(target, id)) {
                return Ok(());
            }
        }
        Err(KeyManagerError::not_authorised(controller, denied))
    }
}

/// Capability bits of one requirement. SUPER flags satisfy their plain counterpart.
fn check_bits(
    controller: Address,
    permissions: Permissions,
    requirement: &Requirement,
) -> Result<(), KeyManagerError> {
    let either = |super_flag: Permissions, flag: Permissions, name: &'static str| {
        if permissions.has(super_flag | flag) {
            Ok(())
        } else {
            Err(KeyManagerError::not_authorised(controller, name))
        }
    };

    match requirement {
        Requirement::Permissions(required) => permissions
            .check(*required)
            .map_err(|name| KeyManagerError::not_authorised(controller, name)),
        Requirement::SetData(_) => either(Permissions::SUPER_SETDATA, Permissions::SETDATA, "SETDATA"),
        Requirement::Call {
            kind,
            transfers_value,
            ..
        } => {
            if *transfers_value {
                either(
                    Permissions::SUPER_TRANSFERVALUE,
                    Permissions::TRANSFERVALUE,
                    "TRANSFERVALUE",
                )?;
            }
            match kind {
                Some(kind) => either(kind.super_permission(), kind.permission(), kind.name()),
                None => Ok(()),
            }
        }
        Requirement::Deploy { funded } => {
            let mut required = Permissions::DEPLOY;
            if *funded {
                // No target exists yet to allow-list the value against.
                required |= Permissions::SUPER_TRANSFERVALUE;
            }
            permissions
                .check(required)
                .map_err(|name| KeyManagerError::not_authorised(controller, name))
        }
    }
}
