#![cfg_attr(not(test), no_std)]

//! LSP6 key manager verification engine shared by the Stylus contract and off-chain tooling.
//!
//! The engine is generic over the account it controls ([`Erc725Account`]) and over its own
//! mutable state ([`KeyManagerState`]); the contract backs both with EVM storage and calls, the
//! tests with in-memory maps.

extern crate alloc;

pub mod account;
pub mod allowed_calls;
pub mod allowed_keys;
pub mod classifier;
pub mod codec;
pub mod crypto;
pub mod errors;
pub mod guard;
pub mod interfaces;
pub mod key_manager;
pub mod keys;
pub mod permissions;
pub mod registry;
pub mod relay;
pub mod state;
pub mod verifier;

#[cfg(test)]
mod testing;

pub use account::Erc725Account;
pub use allowed_calls::{AllowedCall, CallTypes};
pub use errors::{AccountError, KeyManagerError};
pub use key_manager::{ExecutionContext, ExecutionOutcome, KeyManager};
pub use permissions::Permissions;
pub use state::KeyManagerState;
