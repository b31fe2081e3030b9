#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

mod address;
mod bus;
mod command;
mod device;
mod driver;
pub mod ds18x20;
pub mod ds2401;
pub mod ds2413;
mod family;
mod iowire;
#[cfg(feature = "ntp")]
pub mod ntp;
mod result;
mod scan;
mod search;
mod sensor;
#[cfg(test)]
mod sim;

pub use address::{Address, AddressError};
pub use bus::OneWire;
pub use command::{Command, OpCode};
pub use device::Device;
pub use driver::Driver;
pub use family::{Family, Protocol, Reading, FAMILIES};
pub use iowire::IoWire;
pub use result::Error;
pub use scan::{BusScanner, ScanConfig, ScanEvent};
pub use search::{DeviceSearch, DeviceSearchIter};
pub use sensor::Sensor;

/// Continues a 1-Wire CRC8 (x^8 + x^5 + x^4 + 1, reflected) from `crc` over `data`
pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    let mut crc = crc;
    for byte in data.iter() {
        let mut byte = *byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0x00 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// 1-Wire CRC8 of `data`
pub fn compute_crc8(data: &[u8]) -> u8 {
    compute_partial_crc8(0, data)
}

/// Checks `data` against a received CRC byte, returning the computed value on mismatch
pub fn check_crc8(data: &[u8], expected: u8) -> Result<(), u8> {
    let computed = compute_crc8(data);
    if computed == expected {
        Ok(())
    } else {
        Err(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::{check_crc8, compute_crc8, compute_partial_crc8};

    const VECTOR: [u8; 8] = [0x28, 0xFF, 0x4B, 0x1A, 0x60, 0x17, 0x05, 0x9C];

    #[test]
    fn crc_of_empty_is_zero() {
        assert_eq!(compute_crc8(&[]), 0);
    }

    #[test]
    fn crc_validates_own_output() {
        for len in 0..VECTOR.len() {
            let data = &VECTOR[..len];
            assert_eq!(check_crc8(data, compute_crc8(data)), Ok(()));
        }
    }

    #[test]
    fn crc_over_data_and_crc_is_zero() {
        let crc = compute_crc8(&VECTOR);
        assert_eq!(compute_partial_crc8(crc, &[crc]), 0);
    }

    #[test]
    fn every_single_bit_flip_changes_crc() {
        let crc = compute_crc8(&VECTOR);
        for byte in 0..VECTOR.len() {
            for bit in 0..8 {
                let mut flipped = VECTOR;
                flipped[byte] ^= 1 << bit;
                assert_ne!(compute_crc8(&flipped), crc, "byte {} bit {}", byte, bit);
                assert_eq!(check_crc8(&flipped, crc), Err(compute_crc8(&flipped)));
            }
        }
    }

    #[test]
    fn partial_crc_continues() {
        let (head, tail) = VECTOR.split_at(3);
        assert_eq!(
            compute_partial_crc8(compute_partial_crc8(0, head), tail),
            compute_crc8(&VECTOR)
        );
    }
}
