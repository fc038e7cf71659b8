//! Universal serial interface backend (slave only)
//!
//! The USI in two-wire mode detects start conditions and counts SCL edges;
//! everything else is done here. Address matching, acknowledge bits and the
//! transmit/receive turnaround are driven from the two interrupt entry
//! points, [`Usi::on_usi_start`] and [`Usi::on_usi_ovf`].
//!
//! When the machine needs the application it masks the overflow interrupt
//! and leaves the overflow flag set. The peripheral keeps SCL low for as long
//! as the flag is set, so the master waits. The follow-up call reloads the
//! shift register and clears the flag before it enables the interrupt again,
//! so it is safe to make from thread context with interrupts on.

mod phase;

use tinytwi_hal::usi::{usicr, usisr, UsiRegisters};
use tinytwi_hal::BusLine;

use crate::address::{Address, OwnAddress};
use crate::config::BusConfig;
use crate::device::I2cDevice;
use crate::state::{expect_follow_up, Direction, GeneralCall, Operation, Response, State};

use phase::{counter_preset, Phase};

/// Byte clocked out once the application has sent its last byte
pub const IDLE_DATA: u8 = 0xFF;

/// Line samples spent waiting for the master to pull SCL low after a start
const START_SPIN_LIMIT: u16 = 64;

/// Two-wire mode, both interrupts, sampling on the rising edge
const RX_CONTROL: u8 =
    usicr::USISIE | usicr::USIOIE | usicr::TWO_WIRE_HOLD | usicr::EXT_CLOCK_RISING;

/// Two-wire mode, both interrupts, shifting out on the falling edge
const TX_CONTROL: u8 =
    usicr::USISIE | usicr::USIOIE | usicr::TWO_WIRE_HOLD | usicr::EXT_CLOCK_FALLING;

/// Interrupt-driven USI I2C slave
pub struct Usi<R, SDA, SCL> {
    regs: R,
    sda: SDA,
    scl: SCL,
    own: OwnAddress,
    state: State,
    phase: Phase,
    /// The application marked its latest byte as the last one
    last_byte: bool,
    powered: bool,
}

impl<R, SDA, SCL> Usi<R, SDA, SCL>
where
    R: UsiRegisters,
    SDA: BusLine,
    SCL: BusLine,
{
    /// Wrap the USI registers and the two bus pins; stays powered off
    pub fn new(regs: R, sda: SDA, scl: SCL) -> Self {
        Self {
            regs,
            sda,
            scl,
            own: OwnAddress::DISABLED,
            state: State::Idle,
            phase: Phase::Idle,
            last_byte: false,
            powered: false,
        }
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn sda(&self) -> &SDA {
        &self.sda
    }

    pub fn scl(&self) -> &SCL {
        &self.scl
    }

    pub fn sda_mut(&mut self) -> &mut SDA {
        &mut self.sda
    }

    pub fn scl_mut(&mut self) -> &mut SCL {
        &mut self.scl
    }

    /// Give the registers and pins back
    pub fn free(self) -> (R, SDA, SCL) {
        (self.regs, self.sda, self.scl)
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Bring the slave up as described by `config`
    ///
    /// The bit rate is set by the master, so only the slave part is used.
    pub fn configure(&mut self, config: &BusConfig) {
        self.power_on();
        match config.slave {
            Some(slave) => self.slave_on(slave.address, slave.general_call),
            None => self.slave_off(),
        }
    }

    /// Start condition interrupt entry point
    ///
    /// Call from the `USI_START` vector. Prepares to shift in the address.
    /// The start flag rises while SCL is still high; if SDA comes back up
    /// before SCL falls the master sent a stop instead, and the driver goes
    /// back to waiting.
    pub fn on_usi_start(&mut self) -> State {
        self.last_byte = false;
        self.ready_to_read();

        for _ in 0..START_SPIN_LIMIT {
            if self.scl.is_low() || self.sda.is_high() {
                break;
            }
        }
        if self.scl.is_high() && self.sda.is_high() {
            trace!("usi: stop right after start");
            self.await_start();
            self.regs.set_usisr(usisr::USISIF);
            self.state = State::Idle;
            return self.state;
        }

        self.expect(Phase::ReceivingAddress, usisr::FLAGS);
        self.state = State::Busy;
        self.state
    }

    /// Counter overflow interrupt entry point
    ///
    /// Call from the `USI_OVF` vector. Finishes the byte or acknowledge bit
    /// that just went by and sets up the next one.
    pub fn on_usi_ovf(&mut self) -> State {
        let state = match self.phase {
            Phase::Idle | Phase::Refused => {
                self.await_start();
                State::Idle
            }
            Phase::ReceivingAddress => {
                let byte = self.regs.usidr();
                if self.own.matches(byte) {
                    let direction = Direction::from_address_byte(byte);
                    trace!("usi: addressed ({=u8:#x})", byte);
                    self.write(Response::Ack.shift_byte());
                    self.expect(Phase::AddressAcked(direction), usisr::USIOIF);
                    State::Busy
                } else {
                    self.await_start();
                    State::Idle
                }
            }
            Phase::AddressAcked(Direction::Write) | Phase::DataAcked => {
                self.ready_to_read();
                self.expect(Phase::ReceivingData, usisr::USIOIF);
                State::Busy
            }
            Phase::AddressAcked(Direction::Read) => self.stall(State::SlaveTransmit),
            Phase::ReceivingData => self.stall(State::SlaveReceive),
            Phase::TransmittingData => {
                // Let go of SDA and sample the master's acknowledge
                self.ready_to_read();
                self.expect(Phase::TransmitAcked, usisr::USIOIF);
                State::Busy
            }
            Phase::TransmitAcked => {
                if self.regs.usidr() & 1 != 0 {
                    // Master is done reading
                    self.await_start();
                    State::Idle
                } else if self.last_byte {
                    self.write(IDLE_DATA);
                    self.expect(Phase::TransmittingData, usisr::USIOIF);
                    State::Busy
                } else {
                    self.stall(State::SlaveTransmit)
                }
            }
            Phase::AwaitingApplication => {
                warn!("usi: overflow while waiting for the application");
                State::InternalError
            }
        };

        self.state = state;
        state
    }

    /// SDA input, SCL under peripheral control, sample on rising edges
    fn ready_to_read(&mut self) {
        self.sda.release();
        self.scl.attach();
        self.regs.set_usidr(0);
        self.regs.set_usicr(RX_CONTROL);
    }

    /// SDA driven from the shift register, shift out `data` on falling edges
    fn write(&mut self, data: u8) {
        self.sda.attach();
        self.scl.attach();
        self.regs.set_usicr(TX_CONTROL);
        self.regs.set_usidr(data);
    }

    /// Hand a stalled transfer back to the peripheral with `data` to shift out
    ///
    /// The stale overflow flag is cleared before its interrupt is enabled.
    fn resume(&mut self, data: u8, next: Phase) {
        self.sda.attach();
        self.scl.attach();
        self.regs.set_usicr(TX_CONTROL & !usicr::USIOIE);
        self.regs.set_usidr(data);
        self.expect(next, usisr::USIOIF);
        self.regs.set_usicr(TX_CONTROL);
    }

    /// Preset the counter for `next` and clear the flags in `clear`
    ///
    /// Clearing `USIOIF` or `USISIF` releases SCL.
    fn expect(&mut self, next: Phase, clear: u8) {
        self.regs
            .set_usisr(clear | counter_preset(next.bits()));
        self.phase = next;
    }

    /// Hold SCL until the application calls back
    fn stall(&mut self, state: State) -> State {
        let cr = self.regs.usicr() & !usicr::USIOIE;
        self.regs.set_usicr(cr);
        self.phase = Phase::AwaitingApplication;
        state
    }

    /// Ignore the bus until the next start condition
    fn await_start(&mut self) {
        self.ready_to_read();
        self.regs.set_usicr(RX_CONTROL & !usicr::USIOIE);
        self.regs
            .set_usisr(usisr::USIOIF | usisr::USIPF | usisr::USIDC);
        self.phase = Phase::Idle;
    }
}

impl<R, SDA, SCL> I2cDevice for Usi<R, SDA, SCL>
where
    R: UsiRegisters,
    SDA: BusLine,
    SCL: BusLine,
{
    fn power_on(&mut self) {
        if self.powered {
            return;
        }
        self.regs.power_up();
        self.await_start();
        self.powered = true;
        self.state = State::Idle;
        debug!("usi: power on");
    }

    fn power_off(&mut self) {
        expect_follow_up(self.state, Operation::PowerOff);
        if !self.powered {
            return;
        }
        self.regs.set_usicr(0);
        // Drops any stretch in progress
        self.regs.set_usisr(usisr::FLAGS);
        self.sda.release();
        self.scl.release();
        self.regs.power_down();
        self.phase = Phase::Idle;
        self.state = State::Idle;
        self.last_byte = false;
        self.powered = false;
        debug!("usi: power off");
    }

    fn state(&self) -> State {
        self.state
    }

    fn slave_on(&mut self, address: Address, general_call: GeneralCall) {
        self.own = OwnAddress::new(address, general_call);
        if self.powered && self.state == State::Idle {
            self.await_start();
        }
    }

    fn slave_off(&mut self) {
        self.own = OwnAddress::DISABLED;
    }

    fn slave_address(&self) -> Option<Address> {
        self.own.address()
    }

    fn receive_raw(&mut self) -> u8 {
        expect_follow_up(self.state, Operation::ReceiveRaw);
        self.regs.usibr()
    }

    fn ack(&mut self, response: Response) {
        expect_follow_up(self.state, Operation::Ack);
        let next = match response {
            Response::Ack => Phase::DataAcked,
            Response::Nack => Phase::Refused,
        };
        self.resume(response.shift_byte(), next);
        self.state = State::Busy;
    }

    fn transmit(&mut self, data: u8, last: bool) {
        expect_follow_up(self.state, Operation::Transmit);
        self.last_byte = last;
        self.resume(data, Phase::TransmittingData);
        self.state = State::Busy;
    }

    fn poll(&mut self) -> Option<State> {
        if !self.powered {
            return None;
        }
        let sr = self.regs.usisr();
        let overflow_enabled = self.regs.usicr() & usicr::USIOIE != 0;

        if sr & usisr::USISIF != 0 {
            Some(self.on_usi_start())
        } else if sr & usisr::USIOIF != 0 && overflow_enabled {
            Some(self.on_usi_ovf())
        } else if sr & usisr::USIPF != 0 {
            self.regs.set_usisr(usisr::USIPF | (sr & usisr::USICNT_MASK));
            if self.phase == Phase::ReceivingData {
                // Master ended the write between bytes
                self.await_start();
                self.state = State::Idle;
                Some(self.state)
            } else {
                None
            }
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeLine, FakeUsi, LineMode};

    type TestUsi = Usi<FakeUsi, FakeLine, FakeLine>;

    fn slave(gc: GeneralCall) -> TestUsi {
        let mut usi = Usi::new(FakeUsi::new(), FakeLine::new(), FakeLine::new());
        usi.power_on();
        usi.slave_on(Address::new(0x3C).unwrap(), gc);
        usi
    }

    /// Clock a byte (or acknowledge bit) in and run the overflow handler
    fn clock(usi: &mut TestUsi, byte: u8) -> State {
        usi.regs_mut().shift_in(byte);
        usi.on_usi_ovf()
    }

    fn start(usi: &mut TestUsi) -> State {
        usi.regs_mut().start();
        usi.on_usi_start()
    }

    /// Start, address byte, and our acknowledge bit
    fn address(usi: &mut TestUsi, byte: u8) -> State {
        assert_eq!(start(usi), State::Busy);
        let state = clock(usi, byte);
        if state == State::Idle {
            return state;
        }
        assert_eq!(state, State::Busy);
        clock(usi, 0x00)
    }

    #[test]
    fn test_power_on_waits_for_start() {
        let usi = slave(GeneralCall::Disabled);
        assert!(usi.regs().powered);
        assert_eq!(usi.regs().usicr & usicr::USISIE, usicr::USISIE);
        assert_eq!(usi.regs().usicr & usicr::USIOIE, 0);
        assert_eq!(usi.sda().mode, LineMode::Released);
        assert_eq!(usi.scl().mode, LineMode::Attached);
        assert_eq!(usi.state(), State::Idle);
    }

    #[test]
    fn test_configure() {
        let cfg = BusConfig::default().with_slave(Address::new(0x20).unwrap(), GeneralCall::Disabled);
        let mut usi = Usi::new(FakeUsi::new(), FakeLine::new(), FakeLine::new());
        usi.configure(&cfg);
        assert!(usi.is_powered());
        assert_eq!(usi.slave_address(), Address::new(0x20).ok());
        assert_eq!(address(&mut usi, 0x40), State::Busy);
    }

    #[test]
    fn test_start_prepares_address() {
        let mut usi = slave(GeneralCall::Disabled);
        assert_eq!(start(&mut usi), State::Busy);
        assert_eq!(usi.regs().counter(), 0);
        assert!(!usi.regs().holds_clock());
        assert_eq!(usi.regs().usicr, RX_CONTROL);
        assert_eq!(usi.phase, Phase::ReceivingAddress);
    }

    #[test]
    fn test_start_followed_by_stop_is_ignored() {
        let mut usi = slave(GeneralCall::Disabled);
        usi.regs_mut().start();
        usi.scl_mut().high = true;
        usi.sda_mut().high = true;
        assert_eq!(usi.on_usi_start(), State::Idle);
        assert_eq!(usi.phase, Phase::Idle);
        assert!(!usi.regs().holds_clock());
        assert_eq!(usi.regs().usicr & usicr::USIOIE, 0);
    }

    #[test]
    fn test_slow_start_still_receives_address() {
        // SCL never falls within the wait, but SDA stays low: still a start
        let mut usi = slave(GeneralCall::Disabled);
        usi.scl_mut().high = true;
        assert_eq!(start(&mut usi), State::Busy);
        assert_eq!(usi.phase, Phase::ReceivingAddress);
    }

    #[test]
    fn test_address_match_sends_ack() {
        let mut usi = slave(GeneralCall::Disabled);
        start(&mut usi);
        assert_eq!(clock(&mut usi, 0x78), State::Busy);
        assert_eq!(usi.regs().usidr, 0x00);
        assert_eq!(usi.regs().counter(), 14);
        assert_eq!(usi.regs().usicr, TX_CONTROL);
        assert_eq!(usi.sda().mode, LineMode::Attached);
    }

    #[test]
    fn test_foreign_address_ignored() {
        let mut usi = slave(GeneralCall::Disabled);
        start(&mut usi);
        assert_eq!(clock(&mut usi, 0x7A), State::Idle);
        assert_eq!(usi.phase, Phase::Idle);
        assert_eq!(usi.regs().usicr & usicr::USIOIE, 0);
        assert!(!usi.regs().holds_clock());
        assert_eq!(usi.sda().mode, LineMode::Released);
    }

    #[test]
    fn test_general_call() {
        let mut usi = slave(GeneralCall::Disabled);
        assert_eq!(address(&mut usi, 0x00), State::Idle);

        let mut usi = slave(GeneralCall::Enabled);
        assert_eq!(address(&mut usi, 0x00), State::Busy);
        assert_eq!(clock(&mut usi, 0x55), State::SlaveReceive);
        assert_eq!(usi.receive_raw(), 0x55);
    }

    #[test]
    fn test_disabled_slave_ignores_everything() {
        let mut usi = slave(GeneralCall::Enabled);
        usi.slave_off();
        assert_eq!(usi.slave_address(), None);
        assert_eq!(address(&mut usi, 0x78), State::Idle);
        assert_eq!(address(&mut usi, 0x00), State::Idle);
    }

    #[test]
    fn test_scenario_a_slave_receive() {
        let mut usi = slave(GeneralCall::Disabled);
        assert_eq!(address(&mut usi, 0x78), State::Busy);
        assert_eq!(usi.regs().counter(), 0);

        assert_eq!(clock(&mut usi, 0x42), State::SlaveReceive);
        assert!(usi.regs().holds_clock());
        assert_eq!(usi.regs().usicr & usicr::USIOIE, 0);

        // The shift register may change; the buffer keeps the byte
        usi.regs_mut().usidr = 0x00;
        for _ in 0..3 {
            assert_eq!(usi.receive_raw(), 0x42);
        }
        assert_eq!(usi.state(), State::SlaveReceive);
        assert!(usi.regs().holds_clock());

        usi.ack(Response::Ack);
        assert!(!usi.regs().holds_clock());
        assert_eq!(usi.regs().usicr & usicr::USIOIE, usicr::USIOIE);
        assert_eq!(usi.regs().usidr, 0x00);
        assert_eq!(usi.regs().counter(), 14);
        assert_eq!(usi.state(), State::Busy);

        assert_eq!(clock(&mut usi, 0x00), State::Busy);
        assert_eq!(clock(&mut usi, 0x43), State::SlaveReceive);
        assert_eq!(usi.receive(Response::Nack), 0x43);
        assert_eq!(usi.regs().usidr, 0xFF);

        assert_eq!(clock(&mut usi, 0x01), State::Idle);
        assert_eq!(usi.regs().usicr & usicr::USIOIE, 0);
    }

    #[test]
    fn test_scenario_b_slave_transmit() {
        let mut usi = slave(GeneralCall::Disabled);
        assert_eq!(address(&mut usi, 0x79), State::SlaveTransmit);
        assert!(usi.regs().holds_clock());

        usi.transmit(0xAB, false);
        assert_eq!(usi.regs().usidr, 0xAB);
        assert_eq!(usi.regs().counter(), 0);
        assert!(!usi.regs().holds_clock());

        // Byte out, then the master's acknowledge
        assert_eq!(clock(&mut usi, 0xAB), State::Busy);
        assert_eq!(usi.sda().mode, LineMode::Released);
        assert_eq!(usi.regs().counter(), 14);
        assert_eq!(clock(&mut usi, 0x00), State::SlaveTransmit);

        usi.transmit(0xCD, true);
        assert_eq!(clock(&mut usi, 0xCD), State::Busy);
        assert_eq!(clock(&mut usi, 0x01), State::Idle);
        assert_eq!(usi.phase, Phase::Idle);
    }

    #[test]
    fn test_follow_up_clears_overflow_before_enabling_it() {
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x78);
        clock(&mut usi, 0x42);
        usi.regs_mut().early_overflow = false;
        usi.ack(Response::Ack);
        assert!(!usi.regs().early_overflow);
        assert_eq!(usi.regs().usicr, TX_CONTROL);

        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x79);
        usi.regs_mut().early_overflow = false;
        usi.transmit(0x01, false);
        assert!(!usi.regs().early_overflow);
        assert_eq!(usi.regs().usicr, TX_CONTROL);
    }

    #[test]
    fn test_extra_reads_after_last_byte_get_idle_data() {
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x79);
        usi.transmit(0x10, true);
        clock(&mut usi, 0x10);

        // The master keeps acknowledging; no application call is needed
        for _ in 0..3 {
            assert_eq!(clock(&mut usi, 0x00), State::Busy);
            assert_eq!(usi.regs().usidr, IDLE_DATA);
            assert_eq!(usi.sda().mode, LineMode::Attached);
            assert_eq!(clock(&mut usi, IDLE_DATA), State::Busy);
        }
        assert_eq!(clock(&mut usi, 0x01), State::Idle);
    }

    #[test]
    fn test_new_start_clears_last_byte() {
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x79);
        usi.transmit(0x10, true);
        assert!(usi.last_byte);
        start(&mut usi);
        assert!(!usi.last_byte);
    }

    #[test]
    fn test_repeated_start_mid_receive() {
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x78);
        assert_eq!(clock(&mut usi, 0x01), State::SlaveReceive);
        usi.ack(Response::Ack);
        clock(&mut usi, 0x00);
        // Repeated start instead of another data byte
        assert_eq!(address(&mut usi, 0x79), State::SlaveTransmit);
    }

    #[test]
    fn test_poll_services_flags() {
        let mut usi = slave(GeneralCall::Disabled);
        assert_eq!(usi.poll(), None);

        usi.regs_mut().start();
        assert_eq!(usi.poll(), Some(State::Busy));
        usi.regs_mut().shift_in(0x78);
        assert_eq!(usi.poll(), Some(State::Busy));
        usi.regs_mut().shift_in(0x00);
        assert_eq!(usi.poll(), Some(State::Busy));
        usi.regs_mut().shift_in(0x42);
        assert_eq!(usi.poll(), Some(State::SlaveReceive));

        // Stalled: the pending overflow flag is not serviced again
        assert_eq!(usi.poll(), None);
        assert_eq!(usi.state(), State::SlaveReceive);

        usi.ack(Response::Ack);
        usi.regs_mut().shift_in(0x00);
        assert_eq!(usi.poll(), Some(State::Busy));
        assert_eq!(usi.phase, Phase::ReceivingData);

        usi.regs_mut().stop();
        assert_eq!(usi.poll(), Some(State::Idle));
        assert_eq!(usi.regs().usisr & usisr::USIPF, 0);
        assert_eq!(usi.phase, Phase::Idle);
    }

    #[test]
    fn test_overflow_while_stalled_is_internal_error() {
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x78);
        clock(&mut usi, 0x42);
        assert_eq!(usi.on_usi_ovf(), State::InternalError);

        usi.power_off();
        assert_eq!(usi.state(), State::Idle);
    }

    #[test]
    fn test_power_off_releases_everything() {
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x78);
        clock(&mut usi, 0x42);
        assert!(usi.regs().holds_clock());

        usi.power_off();
        assert!(!usi.regs().holds_clock());
        assert!(!usi.regs().powered);
        assert_eq!(usi.regs().usicr, 0);
        assert_eq!(usi.sda().mode, LineMode::Released);
        assert_eq!(usi.scl().mode, LineMode::Released);

        // Idempotent
        usi.power_off();
        assert!(!usi.is_powered());
        assert_eq!(usi.poll(), None);

        // Back on with the same address
        usi.power_on();
        assert_eq!(address(&mut usi, 0x78), State::Busy);
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_ack_in_transmit_state_is_flagged() {
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x79);
        usi.ack(Response::Ack);
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_transmit_while_busy_is_flagged() {
        let mut usi = slave(GeneralCall::Disabled);
        start(&mut usi);
        usi.transmit(0x00, false);
    }

    #[test]
    fn test_every_stall_released_by_its_follow_up() {
        // Receive side: ack releases
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x78);
        clock(&mut usi, 0x01);
        assert!(usi.regs().holds_clock());
        usi.ack(Response::Nack);
        assert!(!usi.regs().holds_clock());

        // Transmit side: transmit releases
        let mut usi = slave(GeneralCall::Disabled);
        address(&mut usi, 0x79);
        assert!(usi.regs().holds_clock());
        usi.transmit(0x01, false);
        assert!(!usi.regs().holds_clock());
    }
}
