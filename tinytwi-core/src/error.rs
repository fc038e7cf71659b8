//! Error types
//!
//! Bus outcomes (lost arbitration, missing acknowledge, undecoded hardware
//! status) are reported as [`State`](crate::State) values by the interrupt
//! entry points. The errors here only cover the layers built on top of that:
//! address validation and the blocking master.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Invalid 7-bit address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// Does not fit in 7 bits
    OutOfRange(u8),
    /// In the 0x78..=0x7F block reserved for 10-bit addressing
    Reserved(u8),
}

impl core::fmt::Display for AddressError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AddressError::OutOfRange(a) => write!(f, "address {:#04x} exceeds 7 bits", a),
            AddressError::Reserved(a) => write!(f, "address {:#04x} is reserved", a),
        }
    }
}

/// Blocking transfer failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Another master won the bus
    ArbitrationLost,
    /// No slave acknowledged the address
    AddressNack,
    /// The slave refused a data byte
    DataNack,
    /// The hardware reported an undecodable status
    Internal,
    /// The poll limit ran out while the bus was stretched
    Timeout,
    /// Target address rejected before touching the bus
    InvalidAddress(AddressError),
}

impl From<AddressError> for Error {
    fn from(e: AddressError) -> Self {
        Error::InvalidAddress(e)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Error::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Error::DataNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Error::Internal => ErrorKind::Bus,
            Error::Timeout | Error::InvalidAddress(_) => ErrorKind::Other,
        }
    }
}
