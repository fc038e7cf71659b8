//! AVR register access for tinytwi
//!
//! Implements the `tinytwi-hal` traits over `avr-device` peripherals:
//!
//! - `atmega328p` feature: [`Atmega328pTwi`] for the two-wire interface
//! - `attiny85` feature: [`Attiny85Usi`] plus the port B bus lines
//!   [`Sda`] and [`Scl`]
//!
//! # Interrupt wiring
//!
//! The state machine only advances when its entry points run, so the
//! integrator has to route the vectors:
//!
//! ```ignore
//! // ATmega328P: one vector
//! #[avr_device::interrupt(atmega328p)]
//! fn TWI() {
//!     BUS.with(|twi| {
//!         let state = twi.on_twi();
//!         // exactly one follow-up for `state`
//!     });
//! }
//!
//! // ATtiny85: start condition and counter overflow
//! #[avr_device::interrupt(attiny85)]
//! fn USI_START() {
//!     BUS.with(|usi| usi.on_usi_start());
//! }
//!
//! #[avr_device::interrupt(attiny85)]
//! fn USI_OVF() {
//!     BUS.with(|usi| {
//!         let state = usi.on_usi_ovf();
//!         // exactly one follow-up for `state`
//!     });
//! }
//! ```

#![no_std]

#[cfg(feature = "atmega328p")]
pub mod atmega328p;
#[cfg(feature = "attiny85")]
pub mod attiny85;

#[cfg(feature = "atmega328p")]
pub use atmega328p::Atmega328pTwi;
#[cfg(feature = "attiny85")]
pub use attiny85::{Attiny85Usi, PortBLine, Scl, Sda};
