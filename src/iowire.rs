use core::fmt::Debug;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

pub trait IoWire {
    type Error: Debug;

    /// Is the input pin high?
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Is the input pin low?
    fn is_low(&mut self) -> Result<bool, Self::Error>;

    /// Drives the pin low
    ///
    /// *NOTE* the actual electrical state of the pin may not actually be low, e.g. due to external
    /// electrical sources
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Releases the pin so the pull-up can take the line high
    ///
    /// *NOTE* the actual electrical state of the pin may not actually be high, e.g. due to external
    /// electrical sources
    fn set_high(&mut self) -> Result<(), Self::Error>;

    /// Switches a strong pull-up for parasite powered devices.
    ///
    /// Plain open-drain wiring has none, so the default does nothing.
    fn set_strong_pullup(&mut self, enable: bool) -> Result<(), Self::Error> {
        let _ = enable;
        Ok(())
    }
}

/// Single line config wrapper
impl<IO> IoWire for (IO,)
where
    IO: ErrorType + OutputPin + InputPin,
{
    type Error = IO::Error;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

/// Dual line config wrapper
impl<E, I, O> IoWire for (I, O)
where
    E: embedded_hal::digital::Error,
    I: ErrorType<Error = E> + InputPin,
    O: ErrorType<Error = E> + OutputPin,
{
    type Error = E;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }
}
