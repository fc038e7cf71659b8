//! Two-wire interface backend
//!
//! The TWI detects start, stop and address matches in hardware and raises
//! one interrupt per bus event with a status code in `TWSR`. While the
//! interrupt flag is set the peripheral holds SCL low, so a decoded state
//! that needs the application simply leaves the flag alone. The follow-up
//! call clears it.
//!
//! The acknowledge bit is armed one byte ahead: `ack` in a receive state
//! picks the acknowledge for the byte that follows.

pub mod status;

use fugit::HertzU32;
use tinytwi_hal::twi::{twcr, twsr, TwiRegisters};

use crate::address::{Address, OwnAddress};
use crate::config::BusConfig;
use crate::device::{I2cDevice, I2cMaster};
use crate::speed::{twi_timing, TwiTiming};
use crate::state::{expect_follow_up, Direction, GeneralCall, Operation, Response, State};

pub use status::{Action, TwiStatus};

/// Reads of `TWCR` spent waiting for a stop to go out during power-off
const STOP_SPIN_LIMIT: u16 = 256;

/// Interrupt-driven TWI slave and master
pub struct Twi<R> {
    regs: R,
    cpu: HertzU32,
    timing: TwiTiming,
    own: OwnAddress,
    state: State,
    /// Address byte to send once the start condition completes
    sla: u8,
    powered: bool,
    /// A master transfer started by this device has not been released
    mastering: bool,
    /// Arbitration was lost and the application has not retried or released
    lost_arbitration: bool,
}

impl<R: TwiRegisters> Twi<R> {
    /// Wrap the TWI registers; the peripheral stays powered off
    pub fn new(regs: R, cpu: HertzU32) -> Self {
        Self {
            regs,
            cpu,
            timing: TwiTiming::reset(cpu),
            own: OwnAddress::DISABLED,
            state: State::Idle,
            sla: 0,
            powered: false,
            mastering: false,
            lost_arbitration: false,
        }
    }

    /// Register access, for wiring and tests
    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Give the registers back
    pub fn free(self) -> R {
        self.regs
    }

    /// Bit rate setting applied on every power-on
    pub fn timing(&self) -> TwiTiming {
        self.timing
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Bring the bus up as described by `config`
    ///
    /// Returns the SCL rate actually achieved.
    pub fn configure(&mut self, config: &BusConfig) -> HertzU32 {
        self.cpu = config.cpu();
        let achieved = self.master_speed(config.bitrate());
        self.power_on();
        match config.slave {
            Some(slave) => self.slave_on(slave.address, slave.general_call),
            None => self.slave_off(),
        }
        achieved
    }

    /// TWI interrupt entry point
    ///
    /// Call from the `TWI` vector. Decodes the status register, performs the
    /// register action the status requires and returns the new state. Never
    /// blocks.
    pub fn on_twi(&mut self) -> State {
        let raw = self.regs.twsr();
        let Some(status) = TwiStatus::from_twsr(raw) else {
            warn!("twi: undecoded status {=u8:#x}", raw & twsr::TWS_MASK);
            self.state = State::InternalError;
            return self.state;
        };

        if status.lost_arbitration() {
            debug!("twi: arbitration lost ({=u8:#x})", status.code());
            self.lost_arbitration = true;
            self.mastering = false;
        }

        let (mut state, action) = status.decode();

        if status == TwiStatus::BusError {
            warn!("twi: bus error");
            if self.mastering {
                self.lost_arbitration = true;
                self.mastering = false;
            }
        }

        // The slave transfer that won the bus is over; surface the pending
        // retry decision instead of a bare idle.
        if state == State::Idle && self.lost_arbitration {
            state = State::MasterLostArbitration;
        }

        match action {
            Action::Hold | Action::Nothing => {}
            Action::SendAddress => {
                self.regs.set_twdr(self.sla);
                // Keep TWEA so a master that wins during our address can select us
                self.release(self.listen_ea());
            }
            Action::Continue => self.release(twcr::TWEA),
            Action::Listen => self.release(self.listen_ea()),
            Action::Recover => self.release(twcr::TWSTO | self.listen_ea()),
        }

        if matches!(status, TwiStatus::OwnSlaW | TwiStatus::GeneralCall | TwiStatus::OwnSlaR) {
            trace!("twi: addressed ({=u8:#x})", status.code());
        }

        self.state = state;
        state
    }

    /// `TWEA` when slave mode is on, so the address is acknowledged
    fn listen_ea(&self) -> u8 {
        if self.own.is_enabled() {
            twcr::TWEA
        } else {
            0
        }
    }

    /// Clear the interrupt flag with the given extra control bits
    fn release(&mut self, bits: u8) {
        self.regs
            .set_twcr(twcr::TWINT | twcr::TWEN | twcr::TWIE | bits);
    }

    /// Set or clear `TWEA` without touching a pending interrupt flag
    ///
    /// Only in states where the flag is already clear; elsewhere the next
    /// release carries the new value.
    fn update_listen(&mut self) {
        let flag_clear = matches!(self.state, State::Idle | State::MasterLostArbitration);
        if !self.powered || !flag_clear {
            // Picked up by the next Listen action
            return;
        }
        let cr = self.regs.twcr() & !(twcr::TWINT | twcr::TWEA);
        self.regs.set_twcr(cr | self.listen_ea());
    }

    fn apply_timing(&mut self) {
        self.regs.set_twbr(self.timing.twbr);
        self.regs.set_twsr(self.timing.prescaler.bits());
    }

    fn own_register(&self) -> u8 {
        if self.own.is_enabled() {
            self.own.bits()
        } else {
            0
        }
    }

    /// Wait a bounded time for a requested stop condition to go out
    fn drain_stop(&mut self) {
        for _ in 0..STOP_SPIN_LIMIT {
            if self.regs.twcr() & twcr::TWSTO == 0 {
                return;
            }
        }
        warn!("twi: stop did not complete");
    }
}

impl<R: TwiRegisters> I2cDevice for Twi<R> {
    fn power_on(&mut self) {
        if self.powered {
            return;
        }
        self.regs.power_up();
        self.apply_timing();
        self.regs.set_twar(self.own_register());
        self.regs
            .set_twcr(twcr::TWEN | twcr::TWIE | self.listen_ea());
        self.powered = true;
        self.state = State::Idle;
        debug!("twi: power on");
    }

    fn power_off(&mut self) {
        expect_follow_up(self.state, Operation::PowerOff);
        if !self.powered {
            return;
        }
        if self.mastering {
            self.release(twcr::TWSTO);
            self.drain_stop();
        }
        self.regs.set_twcr(0);
        self.regs.set_twar(0);
        self.regs.power_down();
        self.powered = false;
        self.mastering = false;
        self.lost_arbitration = false;
        self.state = State::Idle;
        debug!("twi: power off");
    }

    fn state(&self) -> State {
        self.state
    }

    fn slave_on(&mut self, address: Address, general_call: GeneralCall) {
        self.own = OwnAddress::new(address, general_call);
        self.regs.set_twar(self.own.bits());
        self.update_listen();
    }

    fn slave_off(&mut self) {
        self.own = OwnAddress::DISABLED;
        self.regs.set_twar(0);
        self.update_listen();
    }

    fn slave_address(&self) -> Option<Address> {
        self.own.address()
    }

    fn receive_raw(&mut self) -> u8 {
        expect_follow_up(self.state, Operation::ReceiveRaw);
        self.regs.twdr()
    }

    fn ack(&mut self, response: Response) {
        expect_follow_up(self.state, Operation::Ack);
        let ea = match response {
            Response::Ack => twcr::TWEA,
            Response::Nack => 0,
        };
        self.release(ea);
        self.state = State::Busy;
    }

    fn transmit(&mut self, data: u8, last: bool) {
        expect_follow_up(self.state, Operation::Transmit);
        self.regs.set_twdr(data);
        let ea = match self.state {
            // Without TWEA the hardware clocks out ones once this byte is gone
            State::SlaveTransmit if last => 0,
            State::SlaveTransmit => twcr::TWEA,
            _ => self.listen_ea(),
        };
        self.release(ea);
        self.state = State::Busy;
    }

    fn poll(&mut self) -> Option<State> {
        if self.powered && self.regs.interrupt_pending() {
            Some(self.on_twi())
        } else {
            None
        }
    }
}

impl<R: TwiRegisters> I2cMaster for Twi<R> {
    fn master_speed(&mut self, bitrate: HertzU32) -> HertzU32 {
        self.timing = twi_timing(self.cpu, bitrate);
        if self.powered {
            self.apply_timing();
        }
        debug!(
            "twi: bitrate {=u32} Hz (TWBR {=u8}, prescaler {=u8})",
            self.timing.achieved.raw(),
            self.timing.twbr,
            self.timing.prescaler.bits()
        );
        self.timing.achieved
    }

    fn master_txn(&mut self, address: Address, direction: Direction) {
        expect_follow_up(self.state, Operation::MasterTxn);
        self.sla = address.with_direction(direction);
        self.mastering = true;
        self.lost_arbitration = false;
        self.release(twcr::TWSTA | self.listen_ea());
        self.state = State::Busy;
    }

    fn master_release(&mut self) {
        expect_follow_up(self.state, Operation::MasterRelease);
        let owned = self.mastering;
        self.mastering = false;
        self.lost_arbitration = false;
        self.state = State::Idle;
        if owned {
            self.release(twcr::TWSTO | self.listen_ea());
        } else {
            // Flag already cleared by the arbitration loss; refresh TWEA only
            self.update_listen();
        }
    }
}
