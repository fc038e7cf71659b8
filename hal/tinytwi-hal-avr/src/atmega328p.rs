//! ATmega328P two-wire interface

use avr_device::atmega328p::{CPU, TWI};
use tinytwi_hal::twi::TwiRegisters;

/// Power reduction bit for the TWI clock
const PRTWI: u8 = 1 << 7;

/// The TWI register block
pub struct Atmega328pTwi {
    twi: TWI,
}

impl Atmega328pTwi {
    pub fn new(twi: TWI) -> Self {
        Self { twi }
    }

    /// Give the peripheral back
    pub fn free(self) -> TWI {
        self.twi
    }

    /// Read-modify-write the power reduction register
    fn modify_prr(f: impl FnOnce(u8) -> u8) {
        avr_device::interrupt::free(|_| {
            // SAFETY: PRR is shared with other drivers; the update runs
            // with interrupts off and touches only the bits `f` changes.
            let cpu = unsafe { &*CPU::ptr() };
            cpu.prr.modify(|r, w| unsafe { w.bits(f(r.bits())) });
        });
    }
}

impl TwiRegisters for Atmega328pTwi {
    fn twbr(&self) -> u8 {
        self.twi.twbr.read().bits()
    }

    fn set_twbr(&mut self, value: u8) {
        self.twi.twbr.write(|w| unsafe { w.bits(value) });
    }

    fn twsr(&self) -> u8 {
        self.twi.twsr.read().bits()
    }

    fn set_twsr(&mut self, value: u8) {
        self.twi.twsr.write(|w| unsafe { w.bits(value) });
    }

    fn twar(&self) -> u8 {
        self.twi.twar.read().bits()
    }

    fn set_twar(&mut self, value: u8) {
        self.twi.twar.write(|w| unsafe { w.bits(value) });
    }

    fn twdr(&self) -> u8 {
        self.twi.twdr.read().bits()
    }

    fn set_twdr(&mut self, value: u8) {
        self.twi.twdr.write(|w| unsafe { w.bits(value) });
    }

    fn twcr(&self) -> u8 {
        self.twi.twcr.read().bits()
    }

    fn set_twcr(&mut self, value: u8) {
        self.twi.twcr.write(|w| unsafe { w.bits(value) });
    }

    fn power_up(&mut self) {
        Self::modify_prr(|prr| prr & !PRTWI);
    }

    fn power_down(&mut self) {
        Self::modify_prr(|prr| prr | PRTWI);
    }
}
