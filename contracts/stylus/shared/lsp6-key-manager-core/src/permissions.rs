//! LSP6 permission bitmask.
//!
//! A controller's permissions are stored as a single `bytes32` word under
//! `AddressPermissions:Permissions:<address>`. Each capability is one bit; a combined mask is
//! the bitwise OR of its flags. `SUPER_*` flags grant the matching capability without consulting
//! the controller's allow-lists.

use core::ops::{BitAnd, BitOr, BitOrAssign};

use alloy_primitives::{B256, U256};

/// Set of LSP6 permission flags backed by the raw 256-bit word.
///
/// Bits outside the named flags are kept as-is so that a value read from storage can be written
/// back unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Permissions(U256);

const fn flag(bits: u64) -> Permissions {
    Permissions(U256::from_limbs([bits, 0, 0, 0]))
}

impl Permissions {
    pub const NONE: Self = flag(0);

    pub const CHANGEOWNER: Self = flag(0x01);
    pub const ADDCONTROLLER: Self = flag(0x02);
    pub const EDITPERMISSIONS: Self = flag(0x04);
    pub const ADDEXTENSIONS: Self = flag(0x08);
    pub const CHANGEEXTENSIONS: Self = flag(0x10);
    pub const ADDUNIVERSALRECEIVERDELEGATE: Self = flag(0x20);
    pub const CHANGEUNIVERSALRECEIVERDELEGATE: Self = flag(0x40);
    pub const REENTRANCY: Self = flag(0x80);
    pub const SUPER_TRANSFERVALUE: Self = flag(0x0100);
    pub const TRANSFERVALUE: Self = flag(0x0200);
    pub const SUPER_CALL: Self = flag(0x0400);
    pub const CALL: Self = flag(0x0800);
    pub const SUPER_STATICCALL: Self = flag(0x1000);
    pub const STATICCALL: Self = flag(0x2000);
    pub const SUPER_DELEGATECALL: Self = flag(0x4000);
    pub const DELEGATECALL: Self = flag(0x8000);
    pub const DEPLOY: Self = flag(0x01_0000);
    pub const SUPER_SETDATA: Self = flag(0x02_0000);
    pub const SETDATA: Self = flag(0x04_0000);
    pub const ENCRYPT: Self = flag(0x08_0000);
    pub const DECRYPT: Self = flag(0x10_0000);
    pub const SIGN: Self = flag(0x20_0000);

    /// Every flag except REENTRANCY, SUPER_DELEGATECALL and DELEGATECALL.
    pub const ALL_PERMISSIONS: Self = flag(0x3f_3f7f);

    /// Named flags in priority order. Denials report the first unmet entry.
    pub const NAMED: [(Permissions, &'static str); 22] = [
        (Self::CHANGEOWNER, "CHANGEOWNER"),
        (Self::ADDCONTROLLER, "ADDCONTROLLER"),
        (Self::EDITPERMISSIONS, "EDITPERMISSIONS"),
        (Self::ADDEXTENSIONS, "ADDEXTENSIONS"),
        (Self::CHANGEEXTENSIONS, "CHANGEEXTENSIONS"),
        (Self::ADDUNIVERSALRECEIVERDELEGATE, "ADDUNIVERSALRECEIVERDELEGATE"),
        (Self::CHANGEUNIVERSALRECEIVERDELEGATE, "CHANGEUNIVERSALRECEIVERDELEGATE"),
        (Self::REENTRANCY, "REENTRANCY"),
        (Self::SUPER_TRANSFERVALUE, "SUPER_TRANSFERVALUE"),
        (Self::TRANSFERVALUE, "TRANSFERVALUE"),
        (Self::SUPER_CALL, "SUPER_CALL"),
        (Self::CALL, "CALL"),
        (Self::SUPER_STATICCALL, "SUPER_STATICCALL"),
        (Self::STATICCALL, "STATICCALL"),
        (Self::SUPER_DELEGATECALL, "SUPER_DELEGATECALL"),
        (Self::DELEGATECALL, "DELEGATECALL"),
        (Self::DEPLOY, "DEPLOY"),
        (Self::SUPER_SETDATA, "SUPER_SETDATA"),
        (Self::SETDATA, "SETDATA"),
        (Self::ENCRYPT, "ENCRYPT"),
        (Self::DECRYPT, "DECRYPT"),
        (Self::SIGN, "SIGN"),
    ];

    pub const fn from_u256(bits: U256) -> Self {
        Self(bits)
    }

    pub fn from_word(word: B256) -> Self {
        Self(U256::from_be_bytes(word.0))
    }

    pub const fn bits(self) -> U256 {
        self.0
    }

    /// The `bytes32` value stored under the controller's permissions key.
    pub fn to_word(self) -> B256 {
        B256::from(self.0.to_be_bytes::<32>())
    }

    pub fn is_empty(self) -> bool {
        self.0.is_zero()
    }

    /// `(mask & flag) != 0`.
    pub fn has(self, flag: Permissions) -> bool {
        !(self.0 & flag.0).is_zero()
    }

    /// Every bit of `other` is set in `self`.
    pub fn contains(self, other: Permissions) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check that every named flag in `required` is held.
    ///
    /// Returns the name of the first missing flag, in [`Permissions::NAMED`] order.
    pub fn check(self, required: Permissions) -> Result<(), &'static str> {
        for (flag, name) in Self::NAMED.iter() {
            if required.has(*flag) && !self.has(*flag) {
                return Err(*name);
            }
        }
        Ok(())
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}
