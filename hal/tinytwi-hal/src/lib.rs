//! tinytwi Hardware Abstraction Layer
//!
//! This crate defines the register capabilities the I2C state machine in
//! `tinytwi-core` is written against. Chip crates implement them over real
//! memory-mapped registers; tests implement them over plain fields. Nothing
//! in the state machine touches a register directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application / interrupt handlers       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tinytwi-core (state machine)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tinytwi-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ ATmega TWI    │       │ ATtiny USI +  │
//! │ registers     │       │ port B lines  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`twi::TwiRegisters`] - dedicated two-wire interface peripheral
//! - [`usi::UsiRegisters`] - universal serial interface in two-wire mode
//! - [`gpio::BusLine`] - one open-drain bus wire (SDA or SCL)

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod twi;
pub mod usi;

// Re-export key traits at crate root for convenience
pub use gpio::BusLine;
pub use twi::TwiRegisters;
pub use usi::UsiRegisters;
