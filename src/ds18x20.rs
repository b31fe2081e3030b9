use byteorder::{ByteOrder, LittleEndian};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

use crate::{Address, Device, Error, Family, OneWire, OpCode, Protocol, Sensor};

/// Fixed wait between starting a conversion and reading it back.
///
/// Covers the slowest (12-bit) conversion under parasite power regardless of the configured
/// resolution.
pub const CONVERSION_WAIT_MS: u32 = 800;

#[derive(Clone, Copy, Debug)]
#[repr(u8)]
pub enum Command {
    Convert = 0x44,
    ReadScratchpad = 0xBE,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// How the raw temperature register has to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// DS18S20 / DS1820: 9-bit register in half degrees, extended through count remain
    Legacy9Bit,
    /// DS18B20 / DS1822: 1/16 degree register, low bits undefined below 12-bit resolution
    Configurable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MeasureResolution {
    TC8 = 0b0001_1111,
    TC4 = 0b0011_1111,
    TC2 = 0b0101_1111,
    TC = 0b0111_1111,
}

impl MeasureResolution {
    /// Decodes the resolution bits (6 and 5) of a configuration byte
    pub fn from_config(config: u8) -> Self {
        match config & 0x60 {
            0x00 => MeasureResolution::TC8,
            0x20 => MeasureResolution::TC4,
            0x40 => MeasureResolution::TC2,
            _ => MeasureResolution::TC,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            MeasureResolution::TC8 => 9,
            MeasureResolution::TC4 => 10,
            MeasureResolution::TC2 => 11,
            MeasureResolution::TC => 12,
        }
    }

    /// Nominal conversion time from the datasheet
    pub fn time_ms(&self) -> u16 {
        match self {
            MeasureResolution::TC8 => 94,
            MeasureResolution::TC4 => 188,
            MeasureResolution::TC2 => 375,
            MeasureResolution::TC => 750,
        }
    }

    /// Clears the register bits that are undefined at this resolution
    fn mask(&self, raw: i16) -> i16 {
        match self {
            MeasureResolution::TC8 => raw & !7,
            MeasureResolution::TC4 => raw & !3,
            MeasureResolution::TC2 => raw & !1,
            MeasureResolution::TC => raw,
        }
    }
}

/// The 9 byte scratchpad, last byte being the CRC8 of the other eight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scratchpad {
    raw: [u8; Self::BYTES],
}

impl From<[u8; Scratchpad::BYTES]> for Scratchpad {
    fn from(raw: [u8; Scratchpad::BYTES]) -> Self {
        Scratchpad { raw }
    }
}

impl Scratchpad {
    pub const BYTES: usize = 9;

    /// Byte 7 of a DS18S20 scratchpad when count remain may be used
    pub const COUNT_PER_C: u8 = 0x10;

    pub fn raw_temperature(&self) -> i16 {
        LittleEndian::read_i16(&self.raw[0..2])
    }

    pub fn config(&self) -> u8 {
        self.raw[4]
    }

    pub fn count_remain(&self) -> u8 {
        self.raw[6]
    }

    pub fn count_per_c(&self) -> u8 {
        self.raw[7]
    }

    pub fn resolution(&self) -> MeasureResolution {
        MeasureResolution::from_config(self.config())
    }

    pub fn ensure_valid<E: Debug>(&self) -> Result<(), Error<E>> {
        crate::check_crc8(&self.raw[..8], self.raw[8])
            .map_err(|computed| Error::FrameCorrupt(computed, self.raw[8]))
    }

    /// Temperature in degrees Celsius
    pub fn celsius(&self, precision: Precision) -> f32 {
        let raw = self.raw_temperature();
        match precision {
            Precision::Legacy9Bit => {
                let mut raw = raw << 3;
                if self.count_per_c() == Self::COUNT_PER_C {
                    raw = (raw & !0x0F)
                        .wrapping_add(12)
                        .wrapping_sub(self.count_remain() as i16);
                }
                raw as f32 / 16.0
            }
            Precision::Configurable => self.resolution().mask(raw) as f32 * 0.0625,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ds18x20 {
    address: Address,
    precision: Precision,
}

impl From<Ds18x20> for Address {
    fn from(device: Ds18x20) -> Self {
        device.address
    }
}

impl Ds18x20 {
    pub fn with_precision(address: Address, precision: Precision) -> Self {
        Ds18x20 { address, precision }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Starts a conversion, keeping the line powered for parasite supplied sensors
    pub fn start_measurement<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::Error>> {
        bus.reset_select_command(delay, &self.address, Command::Convert, true)
    }

    pub fn read_scratchpad<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Scratchpad, Error<B::Error>> {
        let mut raw = [0u8; Scratchpad::BYTES];
        bus.reset_select_command_read(delay, &self.address, Command::ReadScratchpad, &mut raw)?;
        let scratchpad = Scratchpad::from(raw);
        scratchpad.ensure_valid()?;
        Ok(scratchpad)
    }

    /// Convert, wait `wait_ms`, read back and decode
    pub fn read_temperature<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        wait_ms: u32,
    ) -> Result<f32, Error<B::Error>> {
        self.start_measurement(bus, delay)?;
        log::debug!("{}: conversion started, waiting {} ms", self.address, wait_ms);
        delay.delay_ms(wait_ms);
        Ok(self.read_scratchpad(bus, delay)?.celsius(self.precision))
    }
}

impl Device for Ds18x20 {
    const FAMILY_CODES: &'static [u8] = &[0x10, 0x28, 0x22];

    fn address(&self) -> &Address {
        &self.address
    }

    fn from_address_unchecked(address: Address) -> Self {
        let precision = match Family::from_code(address.family_code()).map(Family::protocol) {
            Some(Protocol::Temperature(precision)) => precision,
            _ => Precision::Configurable,
        };
        Self::with_precision(address, precision)
    }
}

impl Sensor for Ds18x20 {
    type Reading = f32;

    fn read<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<B::Error>> {
        self.read_temperature(bus, delay, CONVERSION_WAIT_MS)
    }
}
