use crate::{Error, IoWire, OneWire};
use embedded_hal::delay::DelayNs;

/// Bit-banged bus master on a single open-drain line.
///
/// Power hold after a write goes through [`IoWire::set_strong_pullup`]. The tuple wires shipped
/// here leave it a no-op, so parasite powered sensors rely on the external pull-up alone unless
/// the wire type switches a strong pull-up itself.
pub struct Driver<W: IoWire> {
    io_wire: W,
}

impl<W: IoWire> Driver<W> {
    pub fn new(io_wire: W) -> Self {
        Driver { io_wire }
    }

    /// Gives the wire back, e.g. to reconfigure the pin
    pub fn release(self) -> W {
        self.io_wire
    }

    fn ensure_wire_high(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<W::Error>> {
        for _ in 0..125 {
            if self.io_wire.is_high()? {
                return Ok(());
            }
            delay.delay_us(2);
        }
        Err(Error::WireFault)
    }
}

impl<W: IoWire> OneWire for Driver<W> {
    type Error = W::Error;

    /// Performs a reset and listens for a presence pulse
    /// Returns Err(WireFault) if the wire seems to be shortened,
    /// Ok(true) if presence pulse has been received and Ok(false)
    /// if no other device was detected but the wire seems to be ok
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<W::Error>> {
        self.io_wire.set_strong_pullup(false)?;
        self.io_wire.set_high()?;
        self.ensure_wire_high(delay)?;

        self.io_wire.set_low()?;
        delay.delay_us(480);
        self.io_wire.set_high()?;

        let mut presence = false;
        for _ in 0..7 {
            delay.delay_us(10);
            presence |= self.io_wire.is_low()?;
        }
        delay.delay_us(410);
        Ok(presence)
    }

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<W::Error>> {
        self.io_wire.set_low()?;
        delay.delay_us(3);
        self.io_wire.set_high()?;
        delay.delay_us(2);
        let val = self.io_wire.is_high()?;
        delay.delay_us(61);
        Ok(val)
    }

    fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool) -> Result<(), Error<W::Error>> {
        self.io_wire.set_low()?;
        delay.delay_us(if high { 10 } else { 65 });
        self.io_wire.set_high()?;
        delay.delay_us(if high { 55 } else { 5 });
        Ok(())
    }

    fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, Error<W::Error>> {
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit(delay)? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    fn write_byte(
        &mut self,
        delay: &mut impl DelayNs,
        byte: u8,
        power_hold: bool,
    ) -> Result<(), Error<W::Error>> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        if power_hold {
            self.io_wire.set_strong_pullup(true)?;
        }
        Ok(())
    }
}
