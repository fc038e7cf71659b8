//! Bus configuration
//!
//! Plain data describing how a bus is brought up. Optionally serde
//! serializable so it can live in EEPROM or a build-time config file.

pub mod types;

pub use types::*;
