#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
#![cfg_attr(not(any(test, feature = "export-abi")), no_std)]

//! LSP6 Key Manager for Arbitrum Stylus.
//!
//! The contract owns nothing but its relay nonces and the reentrancy flag; every permission lives
//! in the ERC725Y store of the account it controls and is checked by `lsp6-key-manager-core`.

extern crate alloc;

pub mod account;
pub mod errors;
pub mod key_manager;

pub use key_manager::Lsp6KeyManager;
