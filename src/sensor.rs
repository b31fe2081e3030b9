use crate::{Device, Error, OneWire};
use embedded_hal::delay::DelayNs;

pub trait Sensor: Device {
    type Reading;

    /// Runs the complete read transaction(s) and returns the decoded value
    fn read<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Self::Reading, Error<B::Error>>;
}
