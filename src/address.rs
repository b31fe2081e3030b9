use crate::{Command, DeviceSearch, Error, OneWire, OpCode};
use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::{Deref, DerefMut},
    str::FromStr,
};
use embedded_hal::delay::DelayNs;

/// 64-bit ROM id: family code, 48-bit serial, CRC8 of the first seven bytes
#[derive(Debug, Clone, Copy, PartialOrd, PartialEq)]
#[repr(transparent)]
pub struct Address {
    raw: [u8; Self::BYTES as usize],
}

impl Default for Address {
    fn default() -> Self {
        Self::from([0; Self::BYTES as usize])
    }
}

impl From<[u8; Self::BYTES as usize]> for Address {
    fn from(raw: [u8; Self::BYTES as usize]) -> Self {
        Address { raw }
    }
}

impl From<Address> for [u8; Address::BYTES as usize] {
    fn from(addr: Address) -> [u8; Address::BYTES as usize] {
        addr.raw
    }
}

impl Deref for Address {
    type Target = [u8; Self::BYTES as usize];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl DerefMut for Address {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.raw
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.deref() as _
    }
}

impl AsMut<[u8]> for Address {
    fn as_mut(&mut self) -> &mut [u8] {
        self.deref_mut() as _
    }
}

impl Address {
    /// The length of device address in bytes
    pub const BYTES: u8 = 8;

    /// The length of device address in bits
    pub const BITS: u8 = Self::BYTES * 8;

    pub fn family_code(&self) -> u8 {
        self[0]
    }

    pub fn serial(&self) -> &[u8] {
        &self[1..7]
    }

    pub fn crc8(&self) -> u8 {
        self[7]
    }

    pub fn is_valid(&self) -> bool {
        crate::check_crc8(&self[..7], self.crc8()).is_ok()
    }

    /// Fails with [`Error::AddressCorrupt`] unless byte 7 is the CRC8 of bytes 0..7
    pub fn ensure_valid<E: Debug>(&self) -> Result<(), Error<E>> {
        crate::check_crc8(&self[..7], self.crc8())
            .map_err(|computed| Error::AddressCorrupt(computed, self.crc8()))
    }
}

/// Error type
#[derive(Debug, PartialEq)]
pub enum AddressError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut addr = Address::default();
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for i in 0..Self::BYTES as usize {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => {
                        addr[i] = (h << 4) | l;
                    }
                    _ => return Err(AddressError::Invalid),
                },
                _ => return Err(AddressError::NotEnough),
            }
        }

        Ok(addr)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}

impl Address {
    /// Reads the address of the only device on the bus
    pub fn read_single<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::Error>> {
        bus.reset_write_read(delay, &[Command::ReadRom.op_code()], self.as_mut())?;
        self.ensure_valid()
    }

    pub fn get_single<B: OneWire>(
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Self, Error<B::Error>> {
        let mut address = Self::default();
        address.read_single(bus, delay)?;
        Ok(address)
    }

    pub fn search_first<B: OneWire>(
        bus: &mut B,
        delay: &mut impl DelayNs,
        family_code: u8,
    ) -> Result<Option<Self>, Error<B::Error>> {
        let mut search = DeviceSearch::new_for_family(family_code);
        while let Some(address) = bus.search_next(&mut search, delay)? {
            if family_code == address.family_code() {
                return Ok(Some(address));
            }
        }
        Ok(None)
    }
}
