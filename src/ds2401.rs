use byteorder::{ByteOrder, LittleEndian};
use embedded_hal::delay::DelayNs;

use crate::{Address, Device, Error, OneWire, Sensor};

/// Silicon serial number (DS2401, DS1990 iButton): the ROM id is all there is to read
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct Ds2401 {
    address: Address,
}

impl From<Ds2401> for Address {
    fn from(device: Ds2401) -> Self {
        device.address
    }
}

impl Ds2401 {
    /// 48-bit serial, least significant byte first on the wire
    pub fn serial_number(&self) -> u64 {
        LittleEndian::read_u48(self.address.serial())
    }
}

impl Device for Ds2401 {
    const FAMILY_CODES: &'static [u8] = &[0x01];

    fn address(&self) -> &Address {
        &self.address
    }

    fn from_address_unchecked(address: Address) -> Self {
        Self { address }
    }
}

impl Sensor for Ds2401 {
    type Reading = u64;

    fn read<B: OneWire>(
        &self,
        _bus: &mut B,
        _delay: &mut impl DelayNs,
    ) -> Result<u64, Error<B::Error>> {
        Ok(self.serial_number())
    }
}
