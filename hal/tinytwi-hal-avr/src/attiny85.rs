//! ATtiny85 universal serial interface and port B lines
//!
//! In two-wire mode the USI owns PB0 (SDA) and PB2 (SCL). The port and
//! direction bits still decide whether the peripheral can pull a line low,
//! so the lines are driven through [`PortBLine`].

use avr_device::attiny85::{CPU, PORTB, USI};
use tinytwi_hal::gpio::BusLine;
use tinytwi_hal::usi::UsiRegisters;

/// Power reduction bit for the USI clock
const PRUSI: u8 = 1 << 1;

/// The USI register block
pub struct Attiny85Usi {
    usi: USI,
}

impl Attiny85Usi {
    pub fn new(usi: USI) -> Self {
        Self { usi }
    }

    pub fn free(self) -> USI {
        self.usi
    }

    fn modify_prr(f: impl FnOnce(u8) -> u8) {
        avr_device::interrupt::free(|_| {
            // SAFETY: PRR is shared with other drivers; the update runs
            // with interrupts off and touches only the bits `f` changes.
            let cpu = unsafe { &*CPU::ptr() };
            cpu.prr.modify(|r, w| unsafe { w.bits(f(r.bits())) });
        });
    }
}

impl UsiRegisters for Attiny85Usi {
    fn usicr(&self) -> u8 {
        self.usi.usicr.read().bits()
    }

    fn set_usicr(&mut self, value: u8) {
        self.usi.usicr.write(|w| unsafe { w.bits(value) });
    }

    fn usisr(&self) -> u8 {
        self.usi.usisr.read().bits()
    }

    fn set_usisr(&mut self, value: u8) {
        self.usi.usisr.write(|w| unsafe { w.bits(value) });
    }

    fn usidr(&self) -> u8 {
        self.usi.usidr.read().bits()
    }

    fn set_usidr(&mut self, value: u8) {
        self.usi.usidr.write(|w| unsafe { w.bits(value) });
    }

    fn usibr(&self) -> u8 {
        self.usi.usibr.read().bits()
    }

    fn power_up(&mut self) {
        Self::modify_prr(|prr| prr & !PRUSI);
    }

    fn power_down(&mut self) {
        Self::modify_prr(|prr| prr | PRUSI);
    }
}

/// One port B pin used as a bus line
///
/// Holding a line requires exclusive use of that pin; the rest of port B
/// stays available because every update is a masked read-modify-write in a
/// critical section.
pub struct PortBLine<const PIN: u8> {
    _private: (),
}

/// PB0, the USI data line
pub type Sda = PortBLine<0>;
/// PB2, the USI clock line
pub type Scl = PortBLine<2>;

impl<const PIN: u8> PortBLine<PIN> {
    const MASK: u8 = 1 << PIN;

    /// Claim the pin
    ///
    /// Takes the port by reference to prove the caller owns the
    /// peripherals; nothing else may configure this pin afterwards.
    pub fn new(_port: &PORTB) -> Self {
        Self { _private: () }
    }

    fn port() -> &'static avr_device::attiny85::portb::RegisterBlock {
        // SAFETY: only the bit for `PIN` is modified, inside critical
        // sections, and the constructor required ownership of PORTB.
        unsafe { &*PORTB::ptr() }
    }

    /// Set the direction bit; the port latch stays high so the pin never
    /// drives the wire by itself
    fn set_output(output: bool) {
        avr_device::interrupt::free(|_| {
            let p = Self::port();
            p.portb.modify(|r, w| unsafe { w.bits(r.bits() | Self::MASK) });
            p.ddrb.modify(|r, w| {
                let bits = if output {
                    r.bits() | Self::MASK
                } else {
                    r.bits() & !Self::MASK
                };
                unsafe { w.bits(bits) }
            });
        });
    }
}

impl<const PIN: u8> BusLine for PortBLine<PIN> {
    fn release(&mut self) {
        Self::set_output(false);
    }

    fn attach(&mut self) {
        Self::set_output(true);
    }

    fn is_high(&self) -> bool {
        Self::port().pinb.read().bits() & Self::MASK != 0
    }
}
