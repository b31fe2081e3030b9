use crate::{Address, Error};
use core::fmt::Debug;

/// Generic device interface
pub trait Device: Sized {
    /// Family codes served by this device type
    const FAMILY_CODES: &'static [u8];

    /// Get device address
    fn address(&self) -> &Address;

    /// Instantiate device using address without checking its family code
    fn from_address_unchecked(address: Address) -> Self;

    /// Instantiate device from address
    fn from_address<E: Sized + Debug>(address: Address) -> Result<Self, Error<E>> {
        if Self::FAMILY_CODES.contains(&address.family_code()) {
            Ok(Self::from_address_unchecked(address))
        } else {
            Err(Error::FamilyCodeMismatch(
                Self::FAMILY_CODES[0],
                address.family_code(),
            ))
        }
    }
}
