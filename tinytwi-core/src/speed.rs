//! Two-wire bit rate selection
//!
//! The TWI clocks SCL at `cpu / (16 + 2 * TWBR * prescaler)` with
//! `TWBR` in `0..=255` and `prescaler` one of 1, 4, 16 or 64. Everything
//! here is pure arithmetic so it can run at compile time or in tests.

use fugit::HertzU32;

/// TWI prescaler, encoded in the low two bits of `TWSR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Prescaler {
    Div1 = 0,
    Div4 = 1,
    Div16 = 2,
    Div64 = 3,
}

impl Prescaler {
    /// All prescalers, smallest first
    pub const ALL: [Prescaler; 4] = [
        Prescaler::Div1,
        Prescaler::Div4,
        Prescaler::Div16,
        Prescaler::Div64,
    ];

    /// Selector bits for `TWSR`
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Division factor
    pub const fn factor(self) -> u32 {
        1 << (2 * self as u32)
    }
}

/// Register values for one bit rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwiTiming {
    /// Bit rate register value
    pub twbr: u8,
    /// Prescaler selector
    pub prescaler: Prescaler,
    /// SCL frequency these values produce
    pub achieved: HertzU32,
}

impl TwiTiming {
    /// Timing for the hardware reset values (TWBR = 0, prescaler 1)
    pub const fn reset(cpu: HertzU32) -> Self {
        Self {
            twbr: 0,
            prescaler: Prescaler::Div1,
            achieved: HertzU32::from_raw(cpu.raw() / 16),
        }
    }
}

/// SCL frequency for a register setting
pub const fn bitrate_for(cpu: HertzU32, twbr: u8, prescaler: Prescaler) -> HertzU32 {
    let divisor = 16 + 2 * twbr as u64 * prescaler.factor() as u64;
    HertzU32::from_raw((cpu.raw() as u64 / divisor) as u32)
}

/// Find the register setting closest to `bitrate`
///
/// Rates above `cpu / 16` (the `TWBR = 0` limit) are clamped to it and a
/// zero rate is treated as 1 Hz. Each prescaler is tried with the divisor
/// rounded both down and up; the smallest absolute error wins and ties keep
/// the smaller prescaler.
pub fn twi_timing(cpu: HertzU32, bitrate: HertzU32) -> TwiTiming {
    let cpu_hz = cpu.raw() as u64;
    let requested = (bitrate.raw() as u64).min(cpu_hz / 16).max(1);

    let mut best = TwiTiming::reset(cpu);
    let mut best_error = u64::MAX;

    for prescaler in Prescaler::ALL {
        let step = 2 * prescaler.factor() as u64 * requested;
        let ideal = cpu_hz.saturating_sub(16 * requested) / step;

        for candidate in [ideal, ideal + 1] {
            let twbr = candidate.min(u8::MAX as u64) as u8;
            let achieved = bitrate_for(cpu, twbr, prescaler);
            let error = (achieved.raw() as u64).abs_diff(requested);
            if error < best_error {
                best_error = error;
                best = TwiTiming {
                    twbr,
                    prescaler,
                    achieved,
                };
            }
        }
    }

    best
}
