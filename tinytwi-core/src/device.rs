//! Device traits
//!
//! The follow-up calls are the same for both backends, so application code
//! and the helpers in [`crate::slave`] and [`crate::blocking`] are written
//! against these traits rather than a concrete peripheral. Interrupt entry
//! points stay inherent methods on each backend because their shape depends
//! on the hardware vectors.

use fugit::HertzU32;

use crate::address::Address;
use crate::state::{Direction, GeneralCall, Response, State};

/// Operations shared by every I2C backend
pub trait I2cDevice {
    /// Ungate the peripheral clock and start listening
    fn power_on(&mut self);

    /// Abandon any transfer and gate the peripheral clock
    ///
    /// Safe to call in any state, and more than once. The slave address is
    /// kept and re-armed by the next `power_on`.
    fn power_off(&mut self);

    /// State reported by the last interrupt or follow-up call
    fn state(&self) -> State;

    /// Answer `address` (and the general call address if enabled)
    fn slave_on(&mut self, address: Address, general_call: GeneralCall);

    /// Stop answering any address
    fn slave_off(&mut self);

    /// Current slave address, `None` when slave mode is off
    fn slave_address(&self) -> Option<Address>;

    /// Read the latched byte without changing state
    ///
    /// Valid in [`State::SlaveReceive`], [`State::MasterReceive`] and, for the
    /// final byte of a master read, [`State::MasterIdle`].
    fn receive_raw(&mut self) -> u8;

    /// Acknowledge decision for a receive state; releases the clock
    fn ack(&mut self, response: Response);

    /// Read the latched byte and answer it in one step
    fn receive(&mut self, response: Response) -> u8 {
        let byte = self.receive_raw();
        self.ack(response);
        byte
    }

    /// Supply the next outgoing byte; releases the clock
    ///
    /// `last` marks the final byte of a slave transmission. Further read
    /// requests from the master are answered with `0xFF` by the driver.
    fn transmit(&mut self, data: u8, last: bool);

    /// Run the interrupt entry point if the hardware has an event pending
    ///
    /// Returns `None` when nothing was pending. Intended for callers that
    /// poll with the peripheral interrupt masked.
    fn poll(&mut self) -> Option<State>;
}

/// Bus master operations
///
/// Only backends with hardware clock generation implement this.
pub trait I2cMaster: I2cDevice {
    /// Select the SCL rate closest to `bitrate`, returning the rate achieved
    fn master_speed(&mut self, bitrate: HertzU32) -> HertzU32;

    /// Issue a (repeated) start and address `address` for `direction`
    fn master_txn(&mut self, address: Address, direction: Direction);

    /// Issue a stop and give up the bus
    fn master_release(&mut self);
}
