use core::fmt::{Display, Formatter, Result as FmtResult};
use embedded_hal::delay::DelayNs;

use crate::{Address, Device, Error, OneWire, OpCode, Sensor};

#[derive(Clone, Copy, Debug)]
#[repr(u8)]
pub enum Command {
    PioAccessRead = 0xF5,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// PIO status byte: state bits in the low nibble, their complement in the high nibble.
///
/// A failed self-check still carries the low nibble, callers decide whether to trust it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchState {
    raw: u8,
}

impl From<u8> for SwitchState {
    fn from(raw: u8) -> Self {
        SwitchState { raw }
    }
}

impl SwitchState {
    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// Low nibble, inverted copy cleared
    pub fn bits(&self) -> u8 {
        self.raw & 0x0F
    }

    pub fn is_valid(&self) -> bool {
        (!self.raw & 0x0F) == (self.raw >> 4)
    }

    pub fn pio_a(&self) -> bool {
        self.raw & 0b0001 != 0
    }

    pub fn pio_a_latch(&self) -> bool {
        self.raw & 0b0010 != 0
    }

    pub fn pio_b(&self) -> bool {
        self.raw & 0b0100 != 0
    }

    pub fn pio_b_latch(&self) -> bool {
        self.raw & 0b1000 != 0
    }
}

impl Display for SwitchState {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let check = if self.is_valid() { "ok" } else { "compl err" };
        write!(f, "{:04b} {}", self.bits(), check)
    }
}

/// Dual channel addressable switch (DS2413 and compatible)
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct Ds2413 {
    address: Address,
}

impl From<Ds2413> for Address {
    fn from(device: Ds2413) -> Self {
        device.address
    }
}

impl Ds2413 {
    pub fn read_state<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<SwitchState, Error<B::Error>> {
        let mut status = [0u8];
        bus.reset_select_command_read(delay, &self.address, Command::PioAccessRead, &mut status)?;
        let state = SwitchState::from(status[0]);
        if !state.is_valid() {
            log::warn!("{}: PIO status {:#04x} fails self-check", self.address, state.raw());
        }
        Ok(state)
    }
}

impl Device for Ds2413 {
    const FAMILY_CODES: &'static [u8] = &[0x3A, 0x85, 0x86];

    fn address(&self) -> &Address {
        &self.address
    }

    fn from_address_unchecked(address: Address) -> Self {
        Self { address }
    }
}

impl Sensor for Ds2413 {
    type Reading = SwitchState;

    fn read<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<SwitchState, Error<B::Error>> {
        self.read_state(bus, delay)
    }
}

#[cfg(test)]
mod tests {
    use super::{Ds2413, SwitchState};
    use crate::sim::{SimBus, SimDevice};
    use crate::{Address, Device, Sensor};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn complemented_nibbles_pass() {
        let state = SwitchState::from(0b1010_0101);
        assert!(state.is_valid());
        assert_eq!(state.bits(), 0b0101);
        assert!(state.pio_a());
        assert!(!state.pio_a_latch());
        assert!(state.pio_b());
        assert!(!state.pio_b_latch());
    }

    #[test]
    fn mismatched_nibbles_fail_but_keep_bits() {
        let state = SwitchState::from(0b1011_0101);
        assert!(!state.is_valid());
        assert_eq!(state.bits(), 0b0101);
        assert_eq!(state.to_string(), "0101 compl err");
    }

    #[test]
    fn all_consistent_bytes_pass() {
        for low in 0..16u8 {
            let state = SwitchState::from(((!low & 0x0F) << 4) | low);
            assert!(state.is_valid());
            assert_eq!(state.bits(), low);
        }
    }

    #[test]
    fn reads_one_status_byte() {
        let rom = SimDevice::rom(0x3A, 0x05);
        let mut bus = SimBus::new(vec![SimDevice::switch(rom, 0b1010_0101)]);
        let switch = Ds2413::from_address_unchecked(Address::from(rom));
        let state = switch.read(&mut bus, &mut NoopDelay::new()).unwrap();
        assert_eq!(state, SwitchState::from(0b1010_0101));
        assert_eq!(bus.commands_for(rom), vec![0xF5]);
    }

    #[test]
    fn failed_self_check_still_returns_value() {
        let rom = SimDevice::rom(0x86, 0x05);
        let mut bus = SimBus::new(vec![SimDevice::switch(rom, 0b1011_0101)]);
        let switch = Ds2413::from_address_unchecked(Address::from(rom));
        let state = switch.read(&mut bus, &mut NoopDelay::new()).unwrap();
        assert!(!state.is_valid());
        assert_eq!(state.bits(), 0b0101);
    }
}
