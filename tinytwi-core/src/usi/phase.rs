//! Byte-level progress of a USI transfer
//!
//! The USI only counts clock edges, so the driver has to remember what the
//! next counter overflow means. None of this is visible to callers; they see
//! [`State`](crate::State) only.

use crate::state::Direction;

/// What the next counter overflow completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Phase {
    /// Waiting for a start condition
    Idle,
    /// Eight address bits
    ReceivingAddress,
    /// Our acknowledge of the address
    AddressAcked(Direction),
    /// Eight data bits from the master
    ReceivingData,
    /// Our acknowledge of a data byte
    DataAcked,
    /// Our not-acknowledge of a data byte; the transfer ends after it
    Refused,
    /// Eight data bits to the master
    TransmittingData,
    /// The master's acknowledge of our byte
    TransmitAcked,
    /// Clock stretched until the application calls back
    AwaitingApplication,
}

impl Phase {
    /// Edges the counter must see before this phase completes
    pub(crate) const fn bits(self) -> u8 {
        match self {
            Phase::AddressAcked(_) | Phase::DataAcked | Phase::Refused | Phase::TransmitAcked => 1,
            _ => 8,
        }
    }
}

/// `USISR` counter preset for `bits` data bits
///
/// The counter advances on both clock edges and overflows from 15 to 0.
pub(crate) const fn counter_preset(bits: u8) -> u8 {
    16u8.wrapping_sub(bits << 1) & 0x0F
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_preset() {
        assert_eq!(counter_preset(8), 0);
        assert_eq!(counter_preset(1), 14);
    }

    #[test]
    fn test_phase_widths() {
        assert_eq!(Phase::ReceivingAddress.bits(), 8);
        assert_eq!(Phase::AddressAcked(Direction::Read).bits(), 1);
        assert_eq!(Phase::TransmitAcked.bits(), 1);
        assert_eq!(Phase::TransmittingData.bits(), 8);
    }
}
