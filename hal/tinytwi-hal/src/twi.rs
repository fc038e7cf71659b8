//! Two-wire interface (TWI) registers
//!
//! Models the ATmega TWI register set. Bit positions follow the datasheet so
//! an implementation can forward values to the hardware unchanged.

/// TWCR - control register bits
pub mod twcr {
    /// Interrupt flag; cleared by writing a one, holds SCL low while set
    pub const TWINT: u8 = 1 << 7;
    /// Enable acknowledge
    pub const TWEA: u8 = 1 << 6;
    /// Generate a (repeated) start condition
    pub const TWSTA: u8 = 1 << 5;
    /// Generate a stop condition
    pub const TWSTO: u8 = 1 << 4;
    /// Write collision flag
    pub const TWWC: u8 = 1 << 3;
    /// Peripheral enable
    pub const TWEN: u8 = 1 << 2;
    /// Interrupt enable
    pub const TWIE: u8 = 1 << 0;
}

/// TWSR - status register fields
pub mod twsr {
    /// Status code bits
    pub const TWS_MASK: u8 = 0xF8;
    /// Prescaler selector bits
    pub const TWPS_MASK: u8 = 0x03;
}

/// TWAR - slave address register fields
pub mod twar {
    /// Respond to the general call address
    pub const TWGCE: u8 = 1 << 0;
}

/// Access to one TWI peripheral
///
/// Reads and writes are raw and unfiltered: writing `TWINT` in a control
/// value clears the hardware flag, exactly as on the chip.
pub trait TwiRegisters {
    /// Bit rate register
    fn twbr(&self) -> u8;
    fn set_twbr(&mut self, value: u8);

    /// Status register (status code and prescaler)
    fn twsr(&self) -> u8;
    fn set_twsr(&mut self, value: u8);

    /// Own slave address register
    fn twar(&self) -> u8;
    fn set_twar(&mut self, value: u8);

    /// Data register
    fn twdr(&self) -> u8;
    fn set_twdr(&mut self, value: u8);

    /// Control register
    fn twcr(&self) -> u8;
    fn set_twcr(&mut self, value: u8);

    /// Ungate the peripheral clock
    fn power_up(&mut self);

    /// Gate the peripheral clock
    fn power_down(&mut self);

    /// Check whether the interrupt flag is raised
    fn interrupt_pending(&self) -> bool {
        self.twcr() & twcr::TWINT != 0
    }
}
