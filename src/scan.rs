use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::ds18x20::CONVERSION_WAIT_MS;
use crate::{Address, DeviceSearch, Error, Family, OneWire, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Wait between conversion start and scratchpad read
    pub conversion_wait_ms: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            conversion_wait_ms: CONVERSION_WAIT_MS,
        }
    }
}

impl ScanConfig {
    pub fn with_conversion_wait_ms(mut self, wait_ms: u32) -> Self {
        self.conversion_wait_ms = wait_ms;
        self
    }
}

/// Outcome of servicing one step of the scan
#[derive(Debug)]
pub enum ScanEvent<E: Sized + Debug> {
    /// A known family was read, successfully or not
    Serviced {
        address: Address,
        family: Family,
        reading: Result<Reading, Error<E>>,
    },
    /// Valid address with a family code nobody handles
    Unrecognized(Address),
    /// Address failed its CRC and was discarded; the search starts over
    Corrupt(Address, Error<E>),
    /// No further device in this pass; the next call begins a new one
    PassComplete,
}

/// Walks the bus one device per call and runs the matching read protocol
#[derive(Debug, Clone, Default)]
pub struct BusScanner {
    search: DeviceSearch,
    config: ScanConfig,
}

impl BusScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScanConfig) -> Self {
        BusScanner {
            search: DeviceSearch::new(),
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Discovers the next device and services it.
    ///
    /// Only bus failures during discovery are returned as `Err`; everything concerning a single
    /// device is reported through the event.
    pub fn service_next<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<ScanEvent<B::Error>, Error<B::Error>> {
        let address = match bus.search_next(&mut self.search, delay) {
            Ok(Some(address)) => address,
            Ok(None) => {
                debug!("W reset");
                return Ok(ScanEvent::PassComplete);
            }
            Err(error) => {
                self.search.reset();
                return Err(error);
            }
        };

        if let Err(error) = address.ensure_valid() {
            warn!("W {} CRC is not valid: {:?}", address, error);
            self.search.reset();
            return Ok(ScanEvent::Corrupt(address, error));
        }

        let Some(family) = Family::from_code(address.family_code()) else {
            info!("W {} Device is not of known family", address);
            return Ok(ScanEvent::Unrecognized(address));
        };

        let reading = family.read(bus, delay, address, &self.config);
        match &reading {
            Ok(value) => info!("W {} {} {}", address, family, value),
            Err(error) => warn!("W {} {} read failed: {:?}", address, family, error),
        }
        Ok(ScanEvent::Serviced {
            address,
            family,
            reading,
        })
    }

    /// Services devices until the pass completes or an address turns out corrupt.
    ///
    /// Every event, including the final one, goes to `on_event`. Returns the number of devices
    /// seen.
    pub fn service_pass<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        mut on_event: impl FnMut(ScanEvent<B::Error>),
    ) -> Result<usize, Error<B::Error>> {
        let mut devices = 0;
        loop {
            let event = self.service_next(bus, delay)?;
            let last = matches!(event, ScanEvent::PassComplete | ScanEvent::Corrupt(..));
            if !matches!(event, ScanEvent::PassComplete) {
                devices += 1;
            }
            on_event(event);
            if last {
                return Ok(devices);
            }
        }
    }
}
