//! Bus line abstraction
//!
//! An I2C wire is open drain: a device either pulls it low or lets the
//! pull-up take it high. The USI backend hands a line to the shift register
//! so the peripheral can hold it low (SCL for clock stretching, SDA for
//! shifting out data) and takes it back when only listening.

/// One physical I2C wire
pub trait BusLine {
    /// Stop driving the line; it floats high unless another device holds it
    fn release(&mut self);

    /// Connect the line to the serial peripheral
    ///
    /// The pin becomes an output with its port latch high, so the line is
    /// low exactly when the peripheral pulls it low.
    fn attach(&mut self);

    /// Sample the logic level currently on the wire
    fn is_high(&self) -> bool;

    fn is_low(&self) -> bool {
        !self.is_high()
    }
}
