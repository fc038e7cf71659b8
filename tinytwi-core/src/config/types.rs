//! Configuration type definitions

use fugit::HertzU32;

use crate::address::Address;
use crate::state::GeneralCall;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Slave side of a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlaveConfig {
    /// Own 7-bit address
    pub address: Address,
    /// Also answer the general call address
    #[cfg_attr(feature = "serde", serde(default))]
    pub general_call: GeneralCall,
}

/// Bus bring-up parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// CPU clock in Hz
    pub cpu_hz: u32,
    /// Requested SCL rate in Hz (ignored by slave-only backends)
    pub bitrate_hz: u32,
    /// Slave mode, `None` for a master-only bus
    #[cfg_attr(feature = "serde", serde(default))]
    pub slave: Option<SlaveConfig>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl BusConfig {
    /// Standard mode (100 kHz) on a 16 MHz part
    pub const STANDARD: Self = Self {
        cpu_hz: 16_000_000,
        bitrate_hz: 100_000,
        slave: None,
    };

    /// Fast mode (400 kHz) on a 16 MHz part
    pub const FAST: Self = Self {
        cpu_hz: 16_000_000,
        bitrate_hz: 400_000,
        slave: None,
    };

    pub const fn with_cpu(self, cpu_hz: u32) -> Self {
        Self { cpu_hz, ..self }
    }

    pub const fn with_slave(self, address: Address, general_call: GeneralCall) -> Self {
        Self {
            slave: Some(SlaveConfig {
                address,
                general_call,
            }),
            ..self
        }
    }

    pub const fn cpu(&self) -> HertzU32 {
        HertzU32::from_raw(self.cpu_hz)
    }

    pub const fn bitrate(&self) -> HertzU32 {
        HertzU32::from_raw(self.bitrate_hz)
    }
}
