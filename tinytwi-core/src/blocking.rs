//! Blocking master on top of the state machine
//!
//! [`BlockingMaster`] drives an [`I2cMaster`] by polling and implements the
//! `embedded-hal` I2C trait, so ordinary device drivers can use the bus.
//! Poll with the peripheral interrupt masked, or the interrupt handler will
//! race this code for the events.

use embedded_hal::i2c::{self, ErrorType, I2c};

use crate::address::Address;
use crate::device::I2cMaster;
use crate::error::Error;
use crate::state::{Direction, Operation, Response, State};

/// Byte clocked out if another master addresses us mid-transfer
const REFUSED_DATA: u8 = 0xFF;

/// Polling `embedded-hal` master
pub struct BlockingMaster<D> {
    device: D,
    poll_limit: Option<u32>,
}

impl<D: I2cMaster> BlockingMaster<D> {
    /// Wrap a powered device; waits forever on a stretched bus
    pub fn new(device: D) -> Self {
        Self {
            device,
            poll_limit: None,
        }
    }

    /// Give up after `polls` polls without the transfer moving on
    ///
    /// On timeout the device is power cycled, which abandons the transfer.
    pub fn with_poll_limit(mut self, polls: u32) -> Self {
        self.poll_limit = Some(polls);
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn free(self) -> D {
        self.device
    }

    /// Poll until the state machine needs a master decision
    fn wait(&mut self) -> Result<State, Error> {
        let mut idle_polls = 0u32;
        loop {
            match self.device.poll() {
                Some(State::Busy) => {}
                // Addressed by the master that beat us; refuse politely
                Some(State::SlaveReceive) => self.device.ack(Response::Nack),
                Some(State::SlaveTransmit) => self.device.transmit(REFUSED_DATA, true),
                Some(state) => return Ok(state),
                None => {
                    if let Some(limit) = self.poll_limit {
                        idle_polls += 1;
                        if idle_polls >= limit {
                            debug!("i2c: poll limit reached");
                            self.abandon();
                            return Err(Error::Timeout);
                        }
                    }
                }
            }
        }
    }

    /// Power cycle the device, dropping whatever was in flight
    fn abandon(&mut self) {
        self.device.power_off();
        self.device.power_on();
    }

    /// Start (or restart) a transfer and wait for the address phase
    fn start(&mut self, address: Address, direction: Direction) -> Result<(), Error> {
        self.device.master_txn(address, direction);
        match (self.wait()?, direction) {
            (State::MasterTransmit, Direction::Write) | (State::MasterReceive, Direction::Read) => {
                Ok(())
            }
            (state, _) => Err(failure(state)),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for &byte in bytes {
            self.device.transmit(byte, false);
            match self.wait()? {
                State::MasterTransmit => {}
                state => return Err(failure(state)),
            }
        }
        Ok(())
    }

    /// Read into every buffer of a run of adjacent read operations
    ///
    /// The acknowledge is armed one byte ahead, so the byte before the last
    /// is answered with `Nack` and the last one arrives in `MasterIdle`.
    fn read_group(&mut self, group: &mut [i2c::Operation<'_>]) -> Result<(), Error> {
        let total: usize = group
            .iter()
            .map(|op| match op {
                i2c::Operation::Read(buf) => buf.len(),
                i2c::Operation::Write(_) => 0,
            })
            .sum();

        let mut remaining = total;
        self.device.ack(arm(remaining));

        for op in group.iter_mut() {
            let i2c::Operation::Read(buf) = op else {
                continue;
            };
            for slot in buf.iter_mut() {
                remaining -= 1;
                match self.wait()? {
                    State::MasterReceive if remaining > 0 => {
                        *slot = self.device.receive_raw();
                        self.device.ack(arm(remaining));
                    }
                    State::MasterIdle if remaining == 0 => *slot = self.device.receive_raw(),
                    state => return Err(failure(state)),
                }
            }
        }

        if total == 0 {
            // A byte is clocked in regardless; drop it
            match self.wait()? {
                State::MasterIdle => {
                    let _ = self.device.receive_raw();
                }
                state => return Err(failure(state)),
            }
        }
        Ok(())
    }

    fn run(&mut self, address: Address, operations: &mut [i2c::Operation<'_>]) -> Result<(), Error> {
        match self.device.state() {
            // Left over from an earlier event; the caller power cycles
            State::InternalError => return Err(Error::Internal),
            // Mid slave transfer, or the bus is otherwise not ours to take
            state if !state.permits(Operation::MasterTxn) => return Err(Error::ArbitrationLost),
            _ => {}
        }

        let mut i = 0;
        while i < operations.len() {
            // Adjacent operations of the same kind share one address phase
            let direction = direction_of(&operations[i]);
            let mut end = i + 1;
            while end < operations.len() && direction_of(&operations[end]) == direction {
                end += 1;
            }

            self.start(address, direction)?;
            let group = &mut operations[i..end];
            match direction {
                Direction::Write => {
                    for op in group.iter() {
                        if let i2c::Operation::Write(bytes) = op {
                            self.write_bytes(bytes)?;
                        }
                    }
                }
                Direction::Read => self.read_group(group)?,
            }
            i = end;
        }
        Ok(())
    }
}

/// Acknowledge to arm while `remaining` bytes are still to come
fn arm(remaining: usize) -> Response {
    if remaining > 1 {
        Response::Ack
    } else {
        Response::Nack
    }
}

fn direction_of(op: &i2c::Operation<'_>) -> Direction {
    match op {
        i2c::Operation::Read(_) => Direction::Read,
        i2c::Operation::Write(_) => Direction::Write,
    }
}

/// Error for a state that ended a transfer early
fn failure(state: State) -> Error {
    match state {
        State::MasterNobodyHome => Error::AddressNack,
        State::MasterIdle => Error::DataNack,
        State::MasterLostArbitration | State::Idle => Error::ArbitrationLost,
        _ => Error::Internal,
    }
}

impl<D: I2cMaster> ErrorType for BlockingMaster<D> {
    type Error = Error;
}

impl<D: I2cMaster> I2c for BlockingMaster<D> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let address = Address::new(address)?;
        let result = self.run(address, operations);

        match result {
            Err(Error::Timeout) => {}
            Err(Error::Internal) => self.abandon(),
            _ => {
                if self.device.state().permits(Operation::MasterRelease) {
                    self.device.master_release();
                }
            }
        }
        result
    }
}
