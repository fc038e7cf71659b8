//! Interrupt-driven I2C for 8-bit AVR
//!
//! One transaction state machine with two hardware backends:
//!
//! - [`twi::Twi`] - the dedicated two-wire interface (slave and master)
//! - [`usi::Usi`] - the universal serial interface run as an I2C slave
//!
//! Every interrupt advances the machine by one step and returns a [`State`].
//! Any state other than [`State::Idle`] and [`State::Busy`] leaves the clock
//! line stretched until the caller performs the one follow-up call listed in
//! [`State::permits`]. Nothing here blocks or retries on its own.
//!
//! Supporting pieces:
//!
//! - Bit rate selection ([`speed`])
//! - Blocking `embedded-hal` master ([`blocking`])
//! - Register-file slave helper ([`slave`])
//! - Interrupt-safe device sharing ([`shared`])
//! - Bus configuration ([`config`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod address;
pub mod blocking;
pub mod config;
pub mod device;
pub mod error;
pub mod shared;
pub mod slave;
pub mod speed;
pub mod state;
pub mod twi;
pub mod usi;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use address::{Address, OwnAddress};
pub use device::{I2cDevice, I2cMaster};
pub use error::{AddressError, Error};
pub use state::{Direction, GeneralCall, Operation, Response, State};
