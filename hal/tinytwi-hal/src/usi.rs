//! Universal serial interface (USI) registers
//!
//! Models the ATtiny USI used in two-wire mode. The USI only detects start
//! conditions and counts clock edges; addressing and acknowledge are up to
//! software.

/// USICR - control register bits
pub mod usicr {
    /// Start condition interrupt enable
    pub const USISIE: u8 = 1 << 7;
    /// Counter overflow interrupt enable
    pub const USIOIE: u8 = 1 << 6;
    /// Wire mode bits; `0b11` is two-wire mode holding SCL low on overflow
    pub const USIWM1: u8 = 1 << 5;
    pub const USIWM0: u8 = 1 << 4;
    /// Clock source select bits
    pub const USICS1: u8 = 1 << 3;
    pub const USICS0: u8 = 1 << 2;
    /// Clock strobe
    pub const USICLK: u8 = 1 << 1;
    /// Toggle clock port pin
    pub const USITC: u8 = 1 << 0;

    /// Two-wire mode with SCL held low on counter overflow
    pub const TWO_WIRE_HOLD: u8 = USIWM1 | USIWM0;
    /// External clock, data register sampled on the rising edge
    pub const EXT_CLOCK_RISING: u8 = USICS1;
    /// External clock, data register shifted out on the falling edge
    pub const EXT_CLOCK_FALLING: u8 = USICS1 | USICS0;
}

/// USISR - status register bits
pub mod usisr {
    /// Start condition flag; holds SCL low while set
    pub const USISIF: u8 = 1 << 7;
    /// Counter overflow flag; holds SCL low while set in hold mode
    pub const USIOIF: u8 = 1 << 6;
    /// Stop condition flag
    pub const USIPF: u8 = 1 << 5;
    /// Data output collision flag
    pub const USIDC: u8 = 1 << 4;
    /// 4-bit edge counter
    pub const USICNT_MASK: u8 = 0x0F;

    /// All flags that are cleared by writing a one
    pub const FLAGS: u8 = USISIF | USIOIF | USIPF | USIDC;
}

/// Access to one USI peripheral
///
/// Flag bits in [`usisr`] are cleared by writing a one; the counter bits are
/// written directly.
pub trait UsiRegisters {
    /// Control register
    fn usicr(&self) -> u8;
    fn set_usicr(&mut self, value: u8);

    /// Status register
    fn usisr(&self) -> u8;
    fn set_usisr(&mut self, value: u8);

    /// Shift (data) register
    fn usidr(&self) -> u8;
    fn set_usidr(&mut self, value: u8);

    /// Buffer register, a copy of the last complete byte
    fn usibr(&self) -> u8;

    /// Ungate the peripheral clock
    fn power_up(&mut self);

    /// Gate the peripheral clock
    fn power_down(&mut self);
}
