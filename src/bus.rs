use crate::{search, Address, Command, DeviceSearch, Error, OpCode};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// Byte level access to a 1-Wire bus.
///
/// A transaction is always reset, select (or skip), command, then reads. The bus has no
/// addressing beyond the last select, so one transaction must finish before the next starts;
/// taking `&mut self` for every step keeps that exclusive.
pub trait OneWire {
    type Error: Sized + Debug;

    /// Sends a reset pulse and returns whether any device answered with a presence pulse
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>>;

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>>;

    fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool)
        -> Result<(), Error<Self::Error>>;

    fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, Error<Self::Error>>;

    /// Writes one byte LSB first. With `power_hold` the line is kept strongly high afterwards
    /// so parasite powered devices can draw conversion current; the next reset ends the hold.
    fn write_byte(
        &mut self,
        delay: &mut impl DelayNs,
        byte: u8,
        power_hold: bool,
    ) -> Result<(), Error<Self::Error>>;

    fn read_bytes(
        &mut self,
        delay: &mut impl DelayNs,
        dst: &mut [u8],
    ) -> Result<(), Error<Self::Error>> {
        for d in dst {
            *d = self.read_byte(delay)?;
        }
        Ok(())
    }

    fn write_bytes(
        &mut self,
        delay: &mut impl DelayNs,
        bytes: &[u8],
    ) -> Result<(), Error<Self::Error>> {
        for b in bytes {
            self.write_byte(delay, *b, false)?;
        }
        Ok(())
    }

    fn write_command(
        &mut self,
        delay: &mut impl DelayNs,
        cmd: impl OpCode,
        power_hold: bool,
    ) -> Result<(), Error<Self::Error>> {
        self.write_byte(delay, cmd.op_code(), power_hold)
    }

    fn ensure_presence(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<Self::Error>> {
        if self.reset(delay)? {
            Ok(())
        } else {
            Err(Error::NoPresence)
        }
    }

    fn select(
        &mut self,
        delay: &mut impl DelayNs,
        addr: &Address,
    ) -> Result<(), Error<Self::Error>> {
        self.write_command(delay, Command::MatchRom, false)?;
        self.write_bytes(delay, addr.as_ref())
    }

    /// Reset, select `addr`, then send `cmd`
    fn reset_select_command(
        &mut self,
        delay: &mut impl DelayNs,
        addr: &Address,
        cmd: impl OpCode,
        power_hold: bool,
    ) -> Result<(), Error<Self::Error>> {
        self.ensure_presence(delay)?;
        self.select(delay, addr)?;
        self.write_command(delay, cmd, power_hold)
    }

    /// Reset, select `addr`, send `cmd` and read `read.len()` bytes back
    fn reset_select_command_read(
        &mut self,
        delay: &mut impl DelayNs,
        addr: &Address,
        cmd: impl OpCode,
        read: &mut [u8],
    ) -> Result<(), Error<Self::Error>> {
        self.reset_select_command(delay, addr, cmd, false)?;
        self.read_bytes(delay, read)
    }

    fn reset_write_read(
        &mut self,
        delay: &mut impl DelayNs,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Error<Self::Error>> {
        self.ensure_presence(delay)?;
        self.write_bytes(delay, write)?;
        self.read_bytes(delay, read)
    }

    /// Next device of the current pass, or `None` once the pass is over.
    ///
    /// `None` also rewinds `search`, so the following call starts a fresh pass.
    fn search_next(
        &mut self,
        search: &mut DeviceSearch,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, Error<Self::Error>> {
        search::search_step(self, search, delay)
    }
}
