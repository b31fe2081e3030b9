use crate::{Address, Command, Error, OneWire};
use embedded_hal::delay::DelayNs;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum SearchState {
    #[default]
    Initialized,
    DeviceFound,
    End,
}

/// Cursor of the ROM search: the last address found plus the branch points still to visit.
///
/// Owned by the caller and handed to [`OneWire::search_next`] once per device, so several
/// buses can be walked independently.
#[derive(Debug, Clone, Default)]
pub struct DeviceSearch {
    address: [u8; 8],
    discrepancies: [u8; 8],
    state: SearchState,
    family: Option<u8>,
}

impl DeviceSearch {
    pub fn new() -> DeviceSearch {
        DeviceSearch::default()
    }

    /// A search that only yields devices of one family
    pub fn new_for_family(family: u8) -> DeviceSearch {
        DeviceSearch {
            family: Some(family),
            ..DeviceSearch::default()
        }
    }

    /// Forgets the current pass; the next step starts over from the first device
    pub fn reset(&mut self) {
        *self = DeviceSearch {
            family: self.family,
            ..DeviceSearch::default()
        };
    }

    pub fn is_finished(&self) -> bool {
        self.state == SearchState::End
    }

    fn is_bit_set_in_address(&self, bit: u8) -> bool {
        DeviceSearch::is_bit_set(&self.address, bit)
    }

    fn write_bit_in_address(&mut self, bit: u8, value: bool) {
        if value {
            DeviceSearch::set_bit(&mut self.address, bit);
        } else {
            DeviceSearch::reset_bit(&mut self.address, bit);
        }
    }

    fn write_bit_in_discrepancy(&mut self, bit: u8, value: bool) {
        if value {
            DeviceSearch::set_bit(&mut self.discrepancies, bit);
        } else {
            DeviceSearch::reset_bit(&mut self.discrepancies, bit);
        }
    }

    fn is_bit_set(array: &[u8], bit: u8) -> bool {
        if bit / 8 >= array.len() as u8 {
            return false;
        }
        let index = bit / 8;
        let offset = bit % 8;
        array[index as usize] & (0x01 << offset) != 0x00
    }

    fn set_bit(array: &mut [u8], bit: u8) {
        if bit / 8 >= array.len() as u8 {
            return;
        }
        let index = bit / 8;
        let offset = bit % 8;
        array[index as usize] |= 0x01 << offset
    }

    fn reset_bit(array: &mut [u8], bit: u8) {
        if bit / 8 >= array.len() as u8 {
            return;
        }
        let index = bit / 8;
        let offset = bit % 8;
        array[index as usize] &= !(0x01 << offset)
    }

    /// Highest bit position where the 0 branch was taken and the 1 branch is still pending
    pub fn last_discrepancy(&self) -> Option<u8> {
        (0..Address::BITS)
            .rev()
            .find(|bit| DeviceSearch::is_bit_set(&self.discrepancies, *bit))
    }

    pub fn into_iter<'a, B: OneWire, D: DelayNs>(
        self,
        bus: &'a mut B,
        delay: &'a mut D,
    ) -> DeviceSearchIter<'a, B, D> {
        DeviceSearchIter {
            search: Some(self),
            bus,
            delay,
        }
    }
}

/// Yields every device of one pass, then stops
pub struct DeviceSearchIter<'a, B: OneWire, D: DelayNs> {
    search: Option<DeviceSearch>,
    bus: &'a mut B,
    delay: &'a mut D,
}

impl<B: OneWire, D: DelayNs> Iterator for DeviceSearchIter<'_, B, D> {
    type Item = Result<Address, Error<B::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut search = self.search.take()?;
        let result = self.bus.search_next(&mut search, &mut *self.delay).transpose()?;
        if result.is_ok() {
            self.search = Some(search);
        }
        Some(result)
    }
}

/// One step of the ROM search; see [`OneWire::search_next`]
pub(crate) fn search_step<B: OneWire + ?Sized>(
    bus: &mut B,
    rom: &mut DeviceSearch,
    delay: &mut impl DelayNs,
) -> Result<Option<Address>, Error<B::Error>> {
    loop {
        match walk(bus, rom, delay)? {
            Some(address) if rom.family.map_or(true, |f| f == address.family_code()) => {
                return Ok(Some(address));
            }
            Some(_) => continue,
            None => {
                log::debug!("search pass complete");
                rom.reset();
                return Ok(None);
            }
        }
    }
}

/// Heavily inspired by https://github.com/ntruchsess/arduino-OneWire/blob/85d1aae63ea4919c64151e03f7e24c2efbc40198/OneWire.cpp#L362
fn walk<B: OneWire + ?Sized>(
    bus: &mut B,
    rom: &mut DeviceSearch,
    delay: &mut impl DelayNs,
) -> Result<Option<Address>, Error<B::Error>> {
    if SearchState::End == rom.state {
        return Ok(None);
    }

    let last_discrepancy = rom.last_discrepancy();

    if last_discrepancy.is_none() && rom.state == SearchState::DeviceFound {
        // no branch left after a found device: that one was the last
        rom.state = SearchState::End;
        return Ok(None);
    }

    if !bus.reset(delay)? {
        return Ok(None);
    }

    bus.write_command(delay, Command::SearchRom, false)?;

    for i in 0..Address::BITS {
        let bit0 = bus.read_bit(delay)?; // normal bit
        let bit1 = bus.read_bit(delay)?; // complement bit

        let direction = match last_discrepancy {
            Some(last) if i < last => {
                // walk previous path
                if bit0 && bit1 {
                    return Ok(None);
                }
                rom.is_bit_set_in_address(i)
            }
            Some(last) if i == last => {
                // take the second branch this time
                rom.write_bit_in_discrepancy(i, false);
                true
            }
            _ => {
                if bit0 && bit1 {
                    // no response received
                    return Ok(None);
                }
                if !bit0 && !bit1 {
                    // addresses with 0 and 1, go first path by default
                    rom.write_bit_in_discrepancy(i, true);
                    false
                } else {
                    bit0
                }
            }
        };
        rom.write_bit_in_address(i, direction);
        bus.write_bit(delay, direction)?;
    }

    rom.state = if rom.last_discrepancy().is_none() {
        SearchState::End
    } else {
        SearchState::DeviceFound
    };
    Ok(Some(Address::from(rom.address)))
}
