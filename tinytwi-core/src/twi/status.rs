//! TWI status codes
//!
//! `TWSR & 0xF8` after the interrupt flag rises. Each code maps to one
//! transaction state and one register action.

use crate::state::State;
use tinytwi_hal::twi::twsr;

/// Hardware status codes the driver understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TwiStatus {
    BusError = 0x00,
    Start = 0x08,
    RepeatedStart = 0x10,
    // Master transmitter
    SlaWAck = 0x18,
    SlaWNack = 0x20,
    MasterDataSentAck = 0x28,
    MasterDataSentNack = 0x30,
    ArbitrationLost = 0x38,
    // Master receiver
    SlaRAck = 0x40,
    SlaRNack = 0x48,
    MasterDataReceivedAck = 0x50,
    MasterDataReceivedNack = 0x58,
    // Slave receiver
    OwnSlaW = 0x60,
    OwnSlaWArbitrationLost = 0x68,
    GeneralCall = 0x70,
    GeneralCallArbitrationLost = 0x78,
    SlaveDataReceivedAck = 0x80,
    SlaveDataReceivedNack = 0x88,
    GeneralCallDataAck = 0x90,
    GeneralCallDataNack = 0x98,
    StopOrRestart = 0xA0,
    // Slave transmitter
    OwnSlaR = 0xA8,
    OwnSlaRArbitrationLost = 0xB0,
    SlaveDataSentAck = 0xB8,
    SlaveDataSentNack = 0xC0,
    SlaveLastSentAck = 0xC8,
    // Miscellaneous
    NoInfo = 0xF8,
}

/// What the driver does to the control register after decoding a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Leave the interrupt flag set; SCL stays low until a follow-up call
    Hold,
    /// Load the latched address byte and clear the flag
    SendAddress,
    /// Clear the flag and acknowledge the next data byte
    Continue,
    /// Clear the flag and return to the not-addressed slave mode
    Listen,
    /// Clear the flag with a stop request to release the lines after a bus error
    Recover,
    /// No register access
    Nothing,
}

impl TwiStatus {
    /// Decode a raw `TWSR` value
    pub fn from_twsr(twsr: u8) -> Option<Self> {
        use TwiStatus::*;

        let status = match twsr & twsr::TWS_MASK {
            0x00 => BusError,
            0x08 => Start,
            0x10 => RepeatedStart,
            0x18 => SlaWAck,
            0x20 => SlaWNack,
            0x28 => MasterDataSentAck,
            0x30 => MasterDataSentNack,
            0x38 => ArbitrationLost,
            0x40 => SlaRAck,
            0x48 => SlaRNack,
            0x50 => MasterDataReceivedAck,
            0x58 => MasterDataReceivedNack,
            0x60 => OwnSlaW,
            0x68 => OwnSlaWArbitrationLost,
            0x70 => GeneralCall,
            0x78 => GeneralCallArbitrationLost,
            0x80 => SlaveDataReceivedAck,
            0x88 => SlaveDataReceivedNack,
            0x90 => GeneralCallDataAck,
            0x98 => GeneralCallDataNack,
            0xA0 => StopOrRestart,
            0xA8 => OwnSlaR,
            0xB0 => OwnSlaRArbitrationLost,
            0xB8 => SlaveDataSentAck,
            0xC0 => SlaveDataSentNack,
            0xC8 => SlaveLastSentAck,
            0xF8 => NoInfo,
            _ => return None,
        };
        Some(status)
    }

    /// Status code value
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The state reported to the caller and the register action to take
    pub fn decode(self) -> (State, Action) {
        use TwiStatus::*;

        match self {
            Start | RepeatedStart => (State::Busy, Action::SendAddress),

            SlaWAck | MasterDataSentAck => (State::MasterTransmit, Action::Hold),
            SlaWNack | SlaRNack => (State::MasterNobodyHome, Action::Hold),
            MasterDataSentNack => (State::MasterIdle, Action::Hold),
            ArbitrationLost => (State::MasterLostArbitration, Action::Listen),

            SlaRAck | MasterDataReceivedAck => (State::MasterReceive, Action::Hold),
            // Final byte of a read, still readable from TWDR
            MasterDataReceivedNack => (State::MasterIdle, Action::Hold),

            OwnSlaW | OwnSlaWArbitrationLost | GeneralCall | GeneralCallArbitrationLost => {
                (State::Busy, Action::Continue)
            }
            SlaveDataReceivedAck | GeneralCallDataAck => (State::SlaveReceive, Action::Hold),
            SlaveDataReceivedNack | GeneralCallDataNack | StopOrRestart => {
                (State::Idle, Action::Listen)
            }

            OwnSlaR | OwnSlaRArbitrationLost | SlaveDataSentAck => {
                (State::SlaveTransmit, Action::Hold)
            }
            SlaveDataSentNack | SlaveLastSentAck => (State::Idle, Action::Listen),

            NoInfo => (State::Busy, Action::Nothing),
            BusError => (State::Idle, Action::Recover),
        }
    }

    /// Check whether this status means another master took the bus
    pub fn lost_arbitration(self) -> bool {
        matches!(
            self,
            TwiStatus::ArbitrationLost
                | TwiStatus::OwnSlaWArbitrationLost
                | TwiStatus::GeneralCallArbitrationLost
                | TwiStatus::OwnSlaRArbitrationLost
        )
    }
}
