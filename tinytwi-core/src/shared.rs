//! Sharing a device between interrupt handlers and the main loop
//!
//! The bus state is touched from the interrupt vector and from ordinary
//! code (`slave_on`, speed changes, master transfers). [`SharedBus`] keeps
//! the device in a critical-section mutex so every access runs with
//! interrupts masked.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// A device slot usable from a `static`
///
/// ```ignore
/// static BUS: SharedBus<Twi<Atmega328pTwi>> = SharedBus::new();
///
/// #[avr_device::interrupt(atmega328p)]
/// fn TWI() {
///     BUS.with(|twi| {
///         let state = twi.on_twi();
///         // perform the follow-up for `state`
///     });
/// }
/// ```
pub struct SharedBus<D> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<D>>>,
}

impl<D> SharedBus<D> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Put a device in the slot, returning the previous one
    pub fn install(&self, device: D) -> Option<D> {
        self.inner.lock(|cell| cell.borrow_mut().replace(device))
    }

    /// Remove the device from the slot
    pub fn take(&self) -> Option<D> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    /// Run `f` on the device with interrupts masked
    ///
    /// Returns `None` if the slot is empty or already borrowed further up
    /// the call stack.
    pub fn with<R>(&self, f: impl FnOnce(&mut D) -> R) -> Option<R> {
        self.inner.lock(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }

    pub fn is_installed(&self) -> bool {
        self.inner.lock(|cell| cell.try_borrow().map_or(true, |slot| slot.is_some()))
    }
}

impl<D> Default for SharedBus<D> {
    fn default() -> Self {
        Self::new()
    }
}
