//! Register-file slave
//!
//! Most I2C slaves expose a small block of registers: a write selects a
//! register, further written bytes land in consecutive registers, and a
//! read streams registers out from the selected one. [`RegisterBank`]
//! implements that on top of any [`I2cDevice`], one interrupt at a time.

use crate::device::I2cDevice;
use crate::state::{Response, State};

/// Byte sent when the bank has no registers to offer
const EMPTY_REGISTER: u8 = 0xFF;

/// What a serviced state did to the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Nothing for the bank in this state
    None,
    /// The register pointer was set
    Selected(u8),
    /// Register `index` was written
    Written { index: u8, value: u8 },
    /// Register `index` was sent to the master
    Read(u8),
    /// A byte was refused
    Refused,
}

/// `N` byte-wide registers behind a slave address
#[derive(Debug, Clone)]
pub struct RegisterBank<const N: usize> {
    registers: [u8; N],
    pointer: usize,
    /// The next received byte selects a register
    selecting: bool,
}

impl<const N: usize> RegisterBank<N> {
    pub const fn new() -> Self {
        Self {
            registers: [0; N],
            pointer: 0,
            selecting: true,
        }
    }

    pub fn registers(&self) -> &[u8; N] {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut [u8; N] {
        &mut self.registers
    }

    /// Register the next read starts from
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Perform the follow-up call `state` requires
    ///
    /// Call with every state an interrupt entry point returns. Master states
    /// are left alone for whoever owns the master side.
    pub fn service<D: I2cDevice>(&mut self, device: &mut D, state: State) -> Event {
        match state {
            State::Idle => {
                self.selecting = true;
                Event::None
            }
            State::SlaveReceive => self.receive(device),
            State::SlaveTransmit => {
                // After a read, the next write starts with a register number
                self.selecting = true;
                let index = self.pointer;
                let value = self.registers.get(index).copied().unwrap_or(EMPTY_REGISTER);
                device.transmit(value, false);
                self.pointer = if index + 1 >= N { 0 } else { index + 1 };
                Event::Read(index as u8)
            }
            _ => Event::None,
        }
    }

    fn receive<D: I2cDevice>(&mut self, device: &mut D) -> Event {
        let byte = device.receive_raw();

        if self.selecting {
            if (byte as usize) < N {
                self.selecting = false;
                self.pointer = byte as usize;
                device.ack(Response::Ack);
                return Event::Selected(byte);
            }
            device.ack(Response::Nack);
            return Event::Refused;
        }

        let index = self.pointer;
        if index >= N {
            device.ack(Response::Nack);
            return Event::Refused;
        }
        self.registers[index] = byte;
        self.pointer = index + 1;
        // Writes stop at the end of the bank instead of wrapping
        let response = if self.pointer < N {
            Response::Ack
        } else {
            Response::Nack
        };
        device.ack(response);
        Event::Written {
            index: index as u8,
            value: byte,
        }
    }
}

impl<const N: usize> Default for RegisterBank<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::mock::{FakeLine, FakeTwi, FakeUsi};
    use crate::state::GeneralCall;
    use crate::twi::Twi;
    use crate::usi::Usi;
    use fugit::RateExtU32;

    type TestUsi = Usi<FakeUsi, FakeLine, FakeLine>;

    fn usi_slave() -> TestUsi {
        let mut usi = Usi::new(FakeUsi::new(), FakeLine::new(), FakeLine::new());
        usi.power_on();
        usi.slave_on(Address::new(0x3C).unwrap(), GeneralCall::Disabled);
        usi
    }

    /// Clock a byte through the USI and let the bank answer
    fn clock<const N: usize>(usi: &mut TestUsi, bank: &mut RegisterBank<N>, byte: u8) -> Event {
        usi.regs_mut().shift_in(byte);
        let state = usi.on_usi_ovf();
        bank.service(usi, state)
    }

    fn begin<const N: usize>(usi: &mut TestUsi, bank: &mut RegisterBank<N>, address: u8) -> Event {
        usi.regs_mut().start();
        let state = usi.on_usi_start();
        bank.service(usi, state);
        clock(usi, bank, address);
        clock(usi, bank, 0x00)
    }

    #[test]
    fn test_write_registers_over_usi() {
        let mut usi = usi_slave();
        let mut bank = RegisterBank::<4>::new();

        begin(&mut usi, &mut bank, 0x78);
        assert_eq!(clock(&mut usi, &mut bank, 0x01), Event::Selected(1));
        assert_eq!(usi.regs().usidr, 0x00);
        clock(&mut usi, &mut bank, 0x00);
        assert_eq!(
            clock(&mut usi, &mut bank, 0xAA),
            Event::Written { index: 1, value: 0xAA }
        );
        clock(&mut usi, &mut bank, 0x00);
        clock(&mut usi, &mut bank, 0xBB);
        assert_eq!(bank.registers(), &[0, 0xAA, 0xBB, 0]);
        assert_eq!(bank.pointer(), 3);
    }

    #[test]
    fn test_write_past_end_is_refused() {
        let mut usi = usi_slave();
        let mut bank = RegisterBank::<2>::new();

        begin(&mut usi, &mut bank, 0x78);
        clock(&mut usi, &mut bank, 0x01);
        clock(&mut usi, &mut bank, 0x00);
        assert_eq!(
            clock(&mut usi, &mut bank, 0x55),
            Event::Written { index: 1, value: 0x55 }
        );
        // Bank full: the byte was answered with a not-acknowledge
        assert_eq!(usi.regs().usidr, 0xFF);
        assert_eq!(clock(&mut usi, &mut bank, 0x01), Event::None);
        assert_eq!(usi.state(), State::Idle);
    }

    #[test]
    fn test_bad_register_number_refused() {
        let mut usi = usi_slave();
        let mut bank = RegisterBank::<2>::new();
        begin(&mut usi, &mut bank, 0x78);
        assert_eq!(clock(&mut usi, &mut bank, 0x07), Event::Refused);
        assert_eq!(usi.regs().usidr, 0xFF);
    }

    #[test]
    fn test_read_wraps_around() {
        let mut usi = usi_slave();
        let mut bank = RegisterBank::<3>::new();
        bank.registers_mut().copy_from_slice(&[0x10, 0x20, 0x30]);

        // Select register 2
        begin(&mut usi, &mut bank, 0x78);
        clock(&mut usi, &mut bank, 0x02);

        // Repeated start into a read
        assert_eq!(begin(&mut usi, &mut bank, 0x79), Event::Read(2));
        assert_eq!(usi.regs().usidr, 0x30);

        clock(&mut usi, &mut bank, 0x30);
        assert_eq!(clock(&mut usi, &mut bank, 0x00), Event::Read(0));
        assert_eq!(usi.regs().usidr, 0x10);

        clock(&mut usi, &mut bank, 0x10);
        assert_eq!(clock(&mut usi, &mut bank, 0x01), Event::None);
        assert_eq!(usi.state(), State::Idle);
    }

    #[test]
    fn test_bank_over_twi() {
        let mut twi = Twi::new(FakeTwi::new(), 16.MHz());
        twi.power_on();
        twi.slave_on(Address::new(0x3C).unwrap(), GeneralCall::Disabled);
        let mut bank = RegisterBank::<4>::new();

        let step = |twi: &mut Twi<FakeTwi>, bank: &mut RegisterBank<4>, code: u8, data: u8| {
            twi.regs_mut().twdr = data;
            twi.regs_mut().raise(code);
            let state = twi.on_twi();
            bank.service(twi, state)
        };

        assert_eq!(step(&mut twi, &mut bank, 0x60, 0x78), Event::None);
        assert_eq!(step(&mut twi, &mut bank, 0x80, 0x02), Event::Selected(2));
        assert_eq!(
            step(&mut twi, &mut bank, 0x80, 0x99),
            Event::Written { index: 2, value: 0x99 }
        );
        assert_eq!(step(&mut twi, &mut bank, 0xA0, 0x00), Event::None);

        // Reads continue from the write pointer
        assert_eq!(step(&mut twi, &mut bank, 0xA8, 0x79), Event::Read(3));
        assert_eq!(bank.registers()[2], 0x99);
    }

    #[test]
    fn test_empty_bank_sends_idle_byte() {
        let mut usi = usi_slave();
        let mut bank = RegisterBank::<0>::new();
        assert_eq!(begin(&mut usi, &mut bank, 0x79), Event::Read(0));
        assert_eq!(usi.regs().usidr, 0xFF);
    }
}
