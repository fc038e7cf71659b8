//! Transaction state and its follow-up contract
//!
//! An interrupt entry point returns one of these states. Every state other
//! than [`State::Idle`] and [`State::Busy`] leaves SCL held low until the
//! caller performs a follow-up the state permits. Skipping it hangs the bus;
//! calling the wrong one is a contract violation, caught by an assertion in
//! debug builds or with the `contract-checks` feature.

/// Where the device is in a bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Bus free, not addressed, nothing in progress
    Idle,
    /// Addressed for a write; a received byte awaits accept or reject
    SlaveReceive,
    /// Addressed for a read; the master waits for the next byte
    SlaveTransmit,
    /// Bus owned by this device, no byte transfer in progress
    MasterIdle,
    /// Last master byte (or the address) was acknowledged by the slave
    MasterTransmit,
    /// A master read is in progress; a byte awaits acknowledge
    MasterReceive,
    /// Another master won the bus; retry or give up
    MasterLostArbitration,
    /// Nobody acknowledged the address
    MasterNobodyHome,
    /// Hardware is mid-byte
    Busy,
    /// Hardware reported something the driver cannot decode
    InternalError,
}

/// Calls that may follow a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// `master_txn`: (repeated) start and address
    MasterTxn,
    /// `master_release`: stop condition
    MasterRelease,
    /// `receive_raw`: read the latched byte
    ReceiveRaw,
    /// `ack`: acknowledge decision, releases the clock
    Ack,
    /// `transmit`: next outgoing byte, releases the clock
    Transmit,
    /// `power_off`: abandon everything
    PowerOff,
}

impl State {
    /// Check whether `op` is a legal next call in this state
    pub fn permits(self, op: Operation) -> bool {
        use Operation::*;
        use State::*;

        match (self, op) {
            (_, PowerOff) => true,

            (Idle, MasterTxn) => true,

            (SlaveReceive, ReceiveRaw | Ack) => true,
            (SlaveTransmit, Transmit) => true,

            // Final byte of a read sits in the data register
            (MasterIdle, ReceiveRaw | MasterTxn | MasterRelease) => true,
            (MasterTransmit, Transmit | MasterTxn | MasterRelease) => true,
            (MasterReceive, ReceiveRaw | Ack) => true,

            (MasterLostArbitration | MasterNobodyHome, MasterTxn | MasterRelease) => true,

            _ => false,
        }
    }

    /// Check whether SCL is stretched until a follow-up call is made
    pub fn holds_clock(self) -> bool {
        !matches!(self, State::Idle | State::Busy)
    }

    /// Check whether this device currently acts as a slave
    pub fn is_slave(self) -> bool {
        matches!(self, State::SlaveReceive | State::SlaveTransmit)
    }

    /// Check whether this device currently drives the bus as master
    pub fn is_master(self) -> bool {
        matches!(
            self,
            State::MasterIdle
                | State::MasterTransmit
                | State::MasterReceive
                | State::MasterNobodyHome
        )
    }
}

/// Assert that `op` is a legal follow-up to `state`
///
/// Compiled out of release builds unless `contract-checks` is enabled.
#[inline]
#[track_caller]
pub(crate) fn expect_follow_up(state: State, op: Operation) {
    if cfg!(any(debug_assertions, feature = "contract-checks")) {
        assert!(
            state.permits(op),
            "i2c contract violation: {:?} called in state {:?}",
            op,
            state
        );
    }
}
