//! Register fakes for host tests
//!
//! - [`FakeTwi`] - TWI registers the test drives by hand, one status at a time
//! - [`SimulatedTwi`] - TWI registers wired to a simulated bus with one slave
//! - [`FakeUsi`] / [`FakeLine`] - USI registers and port lines
//!
//! All fakes clear flag bits the way the hardware does: writing a one clears,
//! writing a zero leaves the flag alone.

use heapless::{Deque, Vec};
use tinytwi_hal::twi::{twcr, twsr, TwiRegisters};
use tinytwi_hal::usi::{usicr, usisr, UsiRegisters};
use tinytwi_hal::BusLine;

/// Control register writes kept by the fakes
pub const LOG_DEPTH: usize = 32;

/// Bytes buffered by the simulated slave
pub const SIM_DEPTH: usize = 32;

/// Statuses reporting our own address (or the general call) acknowledged
const ADDRESSED: [u8; 6] = [0x60, 0x68, 0x70, 0x78, 0xA8, 0xB0];

/// Check whether the hardware could have acknowledged its address with this
/// control register value
fn can_report(status: u8, control: u8) -> bool {
    !ADDRESSED.contains(&(status & twsr::TWS_MASK)) || control & twcr::TWEA != 0
}

/// Flag-accurate TWI registers with a write log
#[derive(Debug, Default)]
pub struct FakeTwi {
    pub twbr: u8,
    pub twsr: u8,
    pub twar: u8,
    pub twdr: u8,
    pub twcr: u8,
    pub powered: bool,
    /// Every value written to `TWCR`, oldest first
    pub twcr_log: Vec<u8, LOG_DEPTH>,
}

impl FakeTwi {
    pub fn new() -> Self {
        Self {
            twsr: 0xF8,
            ..Default::default()
        }
    }

    /// Present `status` and raise the interrupt flag
    ///
    /// Panics on an own-address status while `TWEA` is clear: the hardware
    /// does not acknowledge its address then, so the status cannot occur.
    pub fn raise(&mut self, status: u8) {
        assert!(
            can_report(status, self.twcr),
            "status {:#04x} needs TWEA",
            status
        );
        self.twsr = (status & twsr::TWS_MASK) | (self.twsr & twsr::TWPS_MASK);
        self.twcr |= twcr::TWINT;
    }

    pub fn last_twcr(&self) -> Option<u8> {
        self.twcr_log.last().copied()
    }

    pub fn clear_log(&mut self) {
        self.twcr_log.clear();
    }
}

/// Apply a control register write to the current value
fn write_twcr(current: u8, value: u8) -> u8 {
    let flag = if value & twcr::TWINT != 0 {
        0
    } else {
        current & twcr::TWINT
    };
    (value & !twcr::TWINT) | flag
}

impl TwiRegisters for FakeTwi {
    fn twbr(&self) -> u8 {
        self.twbr
    }

    fn set_twbr(&mut self, value: u8) {
        self.twbr = value;
    }

    fn twsr(&self) -> u8 {
        self.twsr
    }

    fn set_twsr(&mut self, value: u8) {
        // Only the prescaler bits are writable
        self.twsr = (self.twsr & twsr::TWS_MASK) | (value & twsr::TWPS_MASK);
    }

    fn twar(&self) -> u8 {
        self.twar
    }

    fn set_twar(&mut self, value: u8) {
        self.twar = value;
    }

    fn twdr(&self) -> u8 {
        self.twdr
    }

    fn set_twdr(&mut self, value: u8) {
        self.twdr = value;
    }

    fn twcr(&self) -> u8 {
        self.twcr
    }

    fn set_twcr(&mut self, value: u8) {
        let _ = self.twcr_log.push(value);
        self.twcr = write_twcr(self.twcr, value);
    }

    fn power_up(&mut self) {
        self.powered = true;
    }

    fn power_down(&mut self) {
        self.powered = false;
    }
}

/// What the simulated bus expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimPhase {
    /// Bus free
    Free,
    /// Start sent; the next flag clear transmits the address byte
    Address,
    /// Addressed for a write; each flag clear transmits `TWDR`
    Writing,
    /// Addressed for a read; each flag clear clocks in a byte
    Reading,
    /// Address not acknowledged; waiting for a stop or repeated start
    Dead,
}

/// TWI registers attached to a simulated bus
///
/// The bus holds at most one slave. Writing `TWCR` with `TWINT` set makes
/// the simulated hardware carry out the requested action immediately and
/// raise the flag with the resulting status, the way the real peripheral
/// would a few microseconds later.
#[derive(Debug)]
pub struct SimulatedTwi {
    pub twbr: u8,
    pub twsr: u8,
    pub twar: u8,
    pub twdr: u8,
    pub twcr: u8,
    pub powered: bool,
    /// Address of the slave on the bus, if any
    pub slave: Option<u8>,
    /// The slave refuses data after this many bytes
    pub nack_after: Option<usize>,
    /// Report arbitration loss on the next start condition
    pub lose_next_start: bool,
    /// Lose the next address phase to another master sending this address
    /// byte; it selects us only if `TWAR` matches and `TWEA` was set
    pub lose_address_to: Option<u8>,
    /// The slave holds SCL forever after the address
    pub stall: bool,
    phase: SimPhase,
    received: Vec<u8, SIM_DEPTH>,
    responses: Deque<u8, SIM_DEPTH>,
    starts: usize,
    stops: usize,
}

impl SimulatedTwi {
    pub fn new(slave: Option<u8>) -> Self {
        Self {
            twbr: 0,
            twsr: 0xF8,
            twar: 0,
            twdr: 0,
            twcr: 0,
            powered: false,
            slave,
            nack_after: None,
            lose_next_start: false,
            lose_address_to: None,
            stall: false,
            phase: SimPhase::Free,
            received: Vec::new(),
            responses: Deque::new(),
            starts: 0,
            stops: 0,
        }
    }

    /// Queue bytes the slave returns on reads; `0xFF` once exhausted
    pub fn respond_with(&mut self, bytes: &[u8]) {
        for b in bytes {
            let _ = self.responses.push_back(*b);
        }
    }

    /// Bytes the slave has accepted
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Number of (repeated) start conditions generated
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Number of stop conditions generated
    pub fn stops_sent(&self) -> usize {
        self.stops
    }

    /// Put the bus back in the not-addressed state
    pub fn reset_bus(&mut self) {
        self.phase = SimPhase::Free;
        self.twsr = 0xF8 | (self.twsr & twsr::TWPS_MASK);
    }

    fn raise(&mut self, status: u8) {
        self.twsr = status | (self.twsr & twsr::TWPS_MASK);
        self.twcr |= twcr::TWINT;
    }

    fn run(&mut self, cr: u8) {
        if cr & twcr::TWSTO != 0 {
            if self.phase != SimPhase::Free {
                self.stops += 1;
            }
            self.reset_bus();
            // TWSTO clears itself once the stop is on the wire
            self.twcr &= !twcr::TWSTO;
            return;
        }

        if cr & twcr::TWSTA != 0 {
            self.starts += 1;
            if self.lose_next_start {
                self.lose_next_start = false;
                self.phase = SimPhase::Free;
                self.raise(0x38);
                return;
            }
            let code = if self.phase == SimPhase::Free { 0x08 } else { 0x10 };
            self.phase = SimPhase::Address;
            self.raise(code);
            return;
        }

        match self.phase {
            SimPhase::Free | SimPhase::Dead => {}
            SimPhase::Address => {
                if let Some(winner) = self.lose_address_to.take() {
                    self.phase = SimPhase::Free;
                    let code = match (winner >> 1 == self.twar >> 1, winner & 1 != 0) {
                        (true, false) => 0x68,
                        (true, true) => 0xB0,
                        (false, _) => 0x38,
                    };
                    self.raise(if can_report(code, cr) { code } else { 0x38 });
                    return;
                }
                let read = self.twdr & 1 != 0;
                let present = self.slave == Some(self.twdr >> 1);
                if self.stall && present {
                    return;
                }
                let code = match (present, read) {
                    (true, false) => 0x18,
                    (false, false) => 0x20,
                    (true, true) => 0x40,
                    (false, true) => 0x48,
                };
                self.phase = match (present, read) {
                    (false, _) => SimPhase::Dead,
                    (true, false) => SimPhase::Writing,
                    (true, true) => SimPhase::Reading,
                };
                self.raise(code);
            }
            SimPhase::Writing => {
                let _ = self.received.push(self.twdr);
                let refused = self
                    .nack_after
                    .is_some_and(|n| self.received.len() >= n);
                self.raise(if refused { 0x30 } else { 0x28 });
            }
            SimPhase::Reading => {
                self.twdr = self.responses.pop_front().unwrap_or(0xFF);
                self.raise(if cr & twcr::TWEA != 0 { 0x50 } else { 0x58 });
            }
        }
    }
}

impl TwiRegisters for SimulatedTwi {
    fn twbr(&self) -> u8 {
        self.twbr
    }

    fn set_twbr(&mut self, value: u8) {
        self.twbr = value;
    }

    fn twsr(&self) -> u8 {
        self.twsr
    }

    fn set_twsr(&mut self, value: u8) {
        self.twsr = (self.twsr & twsr::TWS_MASK) | (value & twsr::TWPS_MASK);
    }

    fn twar(&self) -> u8 {
        self.twar
    }

    fn set_twar(&mut self, value: u8) {
        self.twar = value;
    }

    fn twdr(&self) -> u8 {
        self.twdr
    }

    fn set_twdr(&mut self, value: u8) {
        self.twdr = value;
    }

    fn twcr(&self) -> u8 {
        self.twcr
    }

    fn set_twcr(&mut self, value: u8) {
        if value & twcr::TWEN == 0 {
            // Switching the peripheral off abandons any transfer
            self.twcr = value & !twcr::TWINT;
            self.reset_bus();
            return;
        }
        self.twcr = write_twcr(self.twcr, value);
        if value & twcr::TWINT != 0 {
            self.run(value);
        }
    }

    fn power_up(&mut self) {
        self.powered = true;
    }

    fn power_down(&mut self) {
        self.powered = false;
    }
}

/// Flag-accurate USI registers
///
/// Tests play the bus side with [`FakeUsi::start`], [`FakeUsi::shift_in`]
/// and [`FakeUsi::stop`].
#[derive(Debug, Default)]
pub struct FakeUsi {
    pub usicr: u8,
    pub usisr: u8,
    pub usidr: u8,
    pub usibr: u8,
    pub powered: bool,
    /// The overflow interrupt was enabled with its flag still pending; on the
    /// chip the vector would fire at once
    pub early_overflow: bool,
}

impl FakeUsi {
    pub fn new() -> Self {
        Self::default()
    }

    /// A start condition was detected
    pub fn start(&mut self) {
        self.usisr |= usisr::USISIF;
    }

    /// The counter overflowed with `byte` in the shift register
    ///
    /// For a one-bit acknowledge phase only bit 0 is meaningful.
    pub fn shift_in(&mut self, byte: u8) {
        self.usidr = byte;
        self.usibr = byte;
        self.usisr = (self.usisr & !usisr::USICNT_MASK) | usisr::USIOIF;
    }

    /// A stop condition was detected
    pub fn stop(&mut self) {
        self.usisr |= usisr::USIPF;
    }

    /// Edges left before the next overflow
    pub fn counter(&self) -> u8 {
        self.usisr & usisr::USICNT_MASK
    }

    /// Check whether the peripheral holds SCL low
    pub fn holds_clock(&self) -> bool {
        self.usisr & (usisr::USISIF | usisr::USIOIF) != 0
    }
}

impl UsiRegisters for FakeUsi {
    fn usicr(&self) -> u8 {
        self.usicr
    }

    fn set_usicr(&mut self, value: u8) {
        if value & usicr::USIOIE != 0 && self.usisr & usisr::USIOIF != 0 {
            self.early_overflow = true;
        }
        self.usicr = value;
    }

    fn usisr(&self) -> u8 {
        self.usisr
    }

    fn set_usisr(&mut self, value: u8) {
        let flags = self.usisr & usisr::FLAGS & !value;
        self.usisr = flags | (value & usisr::USICNT_MASK);
    }

    fn usidr(&self) -> u8 {
        self.usidr
    }

    fn set_usidr(&mut self, value: u8) {
        self.usidr = value;
    }

    fn usibr(&self) -> u8 {
        self.usibr
    }

    fn power_up(&mut self) {
        self.powered = true;
    }

    fn power_down(&mut self) {
        self.powered = false;
    }
}

/// How a fake line is currently driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineMode {
    #[default]
    Released,
    Attached,
}

/// A port pin with an external pull-up
///
/// `mode` records how the driver configured the pin; `high` is the level the
/// test puts on the wire. Lines start low, as SCL is right after a start.
#[derive(Debug, Default)]
pub struct FakeLine {
    pub mode: LineMode,
    pub high: bool,
}

impl FakeLine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BusLine for FakeLine {
    fn release(&mut self) {
        self.mode = LineMode::Released;
    }

    fn attach(&mut self) {
        self.mode = LineMode::Attached;
    }

    fn is_high(&self) -> bool {
        self.high
    }
}
