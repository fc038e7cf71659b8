//! Wire-level tags

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Transfer direction, carried in bit 0 of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master to slave (R/W bit 0)
    Write,
    /// Slave to master (R/W bit 1)
    Read,
}

impl Direction {
    /// Decode the R/W bit of an address byte
    pub const fn from_address_byte(byte: u8) -> Self {
        if byte & 1 == 0 {
            Direction::Write
        } else {
            Direction::Read
        }
    }

    /// Value of the R/W bit on the wire
    pub const fn bit(self) -> u8 {
        match self {
            Direction::Write => 0,
            Direction::Read => 1,
        }
    }
}

/// Acknowledge bit returned for a received byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Pull SDA low; more bytes are welcome
    Ack,
    /// Leave SDA high; stop sending
    Nack,
}

impl Response {
    /// The byte shifted out during the acknowledge clock
    ///
    /// The shift register drives bit 7 onto SDA, so an all-zero byte pulls the
    /// line low and an all-ones byte leaves it released.
    pub const fn shift_byte(self) -> u8 {
        match self {
            Response::Ack => 0x00,
            Response::Nack => 0xFF,
        }
    }
}

/// Whether the slave also answers the general call address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeneralCall {
    Enabled,
    #[default]
    Disabled,
}

impl GeneralCall {
    pub const fn is_enabled(self) -> bool {
        matches!(self, GeneralCall::Enabled)
    }
}

impl From<bool> for GeneralCall {
    fn from(enabled: bool) -> Self {
        if enabled {
            GeneralCall::Enabled
        } else {
            GeneralCall::Disabled
        }
    }
}
