//! Device addressing
//!
//! [`Address`] is a validated 7-bit bus address. [`OwnAddress`] is the
//! one-byte form the slave side keeps: the address in bits 7..1 and the
//! general call enable in bit 0, the same layout as the TWI `TWAR` register.

use crate::error::AddressError;
use crate::state::{Direction, GeneralCall};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 7-bit I2C address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Address(u8);

impl Address {
    /// Broadcast address every general-call-enabled slave answers
    pub const GENERAL_CALL: Address = Address(0x00);

    /// First address of the reserved 10-bit / future block
    const RESERVED_START: u8 = 0x78;

    /// Validate a 7-bit address
    pub const fn new(addr: u8) -> Result<Self, AddressError> {
        if addr > 0x7F {
            Err(AddressError::OutOfRange(addr))
        } else if addr >= Self::RESERVED_START {
            Err(AddressError::Reserved(addr))
        } else {
            Ok(Address(addr))
        }
    }

    /// The 7-bit value
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Address byte as sent on the wire: address in bits 7..1, R/W in bit 0
    pub const fn with_direction(self, direction: Direction) -> u8 {
        (self.0 << 1) | direction.bit()
    }
}

impl TryFrom<u8> for Address {
    type Error = AddressError;

    fn try_from(addr: u8) -> Result<Self, Self::Error> {
        Address::new(addr)
    }
}

impl From<Address> for u8 {
    fn from(addr: Address) -> u8 {
        addr.0
    }
}

/// Own slave address in storage form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OwnAddress(u8);

impl OwnAddress {
    /// Slave mode off; never matches any address byte
    pub const DISABLED: OwnAddress = OwnAddress(0xFF);

    pub const fn new(addr: Address, general_call: GeneralCall) -> Self {
        let gc = if general_call.is_enabled() { 1 } else { 0 };
        OwnAddress((addr.get() << 1) | gc)
    }

    /// Raw storage byte
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_enabled(self) -> bool {
        self.0 != Self::DISABLED.0
    }

    /// The configured address, or `None` when slave mode is off
    pub fn address(self) -> Option<Address> {
        self.is_enabled().then_some(Address(self.0 >> 1))
    }

    pub fn general_call(self) -> GeneralCall {
        GeneralCall::from(self.is_enabled() && self.0 & 1 != 0)
    }

    /// Decide whether a received address byte selects this device
    ///
    /// The R/W bit is ignored. The configured address always matches; the
    /// all-zero general call address matches only when bit 0 is set.
    pub const fn matches(self, byte: u8) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let rx = byte & 0xFE;
        // Either the received address equals ours, or it is zero and the
        // general call bit admits it.
        (rx ^ (self.0 & 0xFE)) == 0 || (rx | (!self.0 & 1)) == 0
    }
}

impl Default for OwnAddress {
    fn default() -> Self {
        Self::DISABLED
    }
}
