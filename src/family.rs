use core::fmt::{Display, Formatter, Result as FmtResult};
use embedded_hal::delay::DelayNs;

use crate::ds18x20::{Ds18x20, Precision};
use crate::ds2401::Ds2401;
use crate::ds2413::{Ds2413, SwitchState};
use crate::{Address, Device, Error, OneWire, ScanConfig};

/// Device families this crate knows how to service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Ds2401,
    Ds18s20,
    Ds18b20,
    Ds1822,
    Ds2413,
    Ds2100h,
    Cx2413,
}

/// Read protocol used for a family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Temperature(Precision),
    Switch,
    SerialNumber,
}

/// Every known family, in family code order
pub const FAMILIES: [Family; 7] = [
    Family::Ds2401,
    Family::Ds18s20,
    Family::Ds1822,
    Family::Ds18b20,
    Family::Ds2413,
    Family::Ds2100h,
    Family::Cx2413,
];

/// Decoded value of one serviced device
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Degrees Celsius
    Temperature(f32),
    Switch(SwitchState),
    SerialNumber(u64),
}

impl Display for Reading {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Reading::Temperature(celsius) => write!(f, "Temp = {:.2} C", celsius),
            Reading::Switch(state) => write!(f, "result: {}", state),
            Reading::SerialNumber(serial) => write!(f, "serial {:012x}", serial),
        }
    }
}

impl Family {
    pub fn from_code(code: u8) -> Option<Family> {
        FAMILIES.into_iter().find(|family| family.code() == code)
    }

    pub fn code(self) -> u8 {
        match self {
            Family::Ds2401 => 0x01,
            Family::Ds18s20 => 0x10,
            Family::Ds18b20 => 0x28,
            Family::Ds1822 => 0x22,
            Family::Ds2413 => 0x3A,
            Family::Ds2100h => 0x85,
            Family::Cx2413 => 0x86,
        }
    }

    pub fn protocol(self) -> Protocol {
        match self {
            Family::Ds2401 => Protocol::SerialNumber,
            Family::Ds18s20 => Protocol::Temperature(Precision::Legacy9Bit),
            Family::Ds18b20 | Family::Ds1822 => Protocol::Temperature(Precision::Configurable),
            Family::Ds2413 | Family::Ds2100h | Family::Cx2413 => Protocol::Switch,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Family::Ds2401 => "DS2401 Serial Number",
            Family::Ds18s20 => "DS18S20",
            Family::Ds18b20 => "DS18B20",
            Family::Ds1822 => "DS1822",
            Family::Ds2413 => "DS2413 Dual Switch",
            Family::Ds2100h => "2100H Dual Switch",
            Family::Cx2413 => "CX2413 Occupy Detect",
        }
    }

    /// Runs this family's read protocol against `address`
    pub fn read<B: OneWire>(
        self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: Address,
        config: &ScanConfig,
    ) -> Result<Reading, Error<B::Error>> {
        match self.protocol() {
            Protocol::Temperature(precision) => Ds18x20::with_precision(address, precision)
                .read_temperature(bus, delay, config.conversion_wait_ms)
                .map(Reading::Temperature),
            Protocol::Switch => Ds2413::from_address_unchecked(address)
                .read_state(bus, delay)
                .map(Reading::Switch),
            Protocol::SerialNumber => Ok(Reading::SerialNumber(
                Ds2401::from_address_unchecked(address).serial_number(),
            )),
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::{Family, Protocol, Reading, FAMILIES};
    use crate::ds18x20::Precision;
    use crate::ds2413::SwitchState;
    use crate::sim::{SimBus, SimDevice};
    use crate::{Address, ScanConfig};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn table_routes_known_codes() {
        assert_eq!(
            Family::from_code(0x10).map(Family::protocol),
            Some(Protocol::Temperature(Precision::Legacy9Bit))
        );
        assert_eq!(
            Family::from_code(0x28).map(Family::protocol),
            Some(Protocol::Temperature(Precision::Configurable))
        );
        assert_eq!(
            Family::from_code(0x22).map(Family::protocol),
            Some(Protocol::Temperature(Precision::Configurable))
        );
        for code in [0x3A, 0x85, 0x86] {
            assert_eq!(Family::from_code(code).map(Family::protocol), Some(Protocol::Switch));
        }
        assert_eq!(Family::from_code(0x01), Some(Family::Ds2401));
    }

    #[test]
    fn unknown_codes_are_not_routed() {
        for code in [0x00, 0x02, 0x26, 0x42, 0xFF] {
            assert_eq!(Family::from_code(code), None);
        }
    }

    #[test]
    fn every_family_routes_to_itself() {
        for family in FAMILIES {
            assert_eq!(Family::from_code(family.code()), Some(family));
        }
    }

    #[test]
    fn family_codes_are_distinct() {
        for (i, a) in FAMILIES.iter().enumerate() {
            for b in &FAMILIES[i + 1..] {
                assert_ne!(a.code(), b.code(), "{} and {}", a, b);
            }
        }
    }

    #[test]
    fn dispatch_runs_switch_protocol() {
        let rom = SimDevice::rom(0x85, 0x09);
        let mut bus = SimBus::new(vec![SimDevice::switch(rom, 0xE1)]);
        let reading = Family::Ds2100h
            .read(&mut bus, &mut NoopDelay::new(), Address::from(rom), &ScanConfig::default())
            .unwrap();
        assert_eq!(reading, Reading::Switch(SwitchState::from(0xE1)));
        assert_eq!(reading.to_string(), "result: 0001 ok");
    }

    #[test]
    fn dispatch_serial_number_touches_no_bus() {
        let rom = SimDevice::rom(0x01, 0x33);
        let mut bus = SimBus::new(vec![SimDevice::identity(rom)]);
        let reading = Family::Ds2401
            .read(&mut bus, &mut NoopDelay::new(), Address::from(rom), &ScanConfig::default())
            .unwrap();
        assert_eq!(reading, Reading::SerialNumber(0x33));
        assert_eq!(bus.resets, 0);
    }
}
