//! In-memory bus for tests: devices answer ROM commands, the search protocol and the few
//! function commands this crate issues.

use crate::{compute_crc8, Error, OneWire};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub(crate) enum Memory {
    Scratchpad([u8; 9]),
    Status(u8),
    None,
}

#[derive(Debug, Clone)]
pub(crate) struct SimDevice {
    pub(crate) rom: [u8; 8],
    pub(crate) memory: Memory,
}

impl SimDevice {
    /// ROM with a one byte serial and a valid CRC
    pub(crate) fn rom(family: u8, serial: u8) -> [u8; 8] {
        let mut rom = [family, serial, 0, 0, 0, 0, 0, 0];
        rom[7] = compute_crc8(&rom[..7]);
        rom
    }

    pub(crate) fn temperature(rom: [u8; 8], frame: [u8; 8]) -> Self {
        let mut scratchpad = [0; 9];
        scratchpad[..8].copy_from_slice(&frame);
        scratchpad[8] = compute_crc8(&frame);
        Self::raw_scratchpad(rom, scratchpad)
    }

    pub(crate) fn raw_scratchpad(rom: [u8; 8], scratchpad: [u8; 9]) -> Self {
        SimDevice {
            rom,
            memory: Memory::Scratchpad(scratchpad),
        }
    }

    pub(crate) fn switch(rom: [u8; 8], status: u8) -> Self {
        SimDevice {
            rom,
            memory: Memory::Status(status),
        }
    }

    pub(crate) fn identity(rom: [u8; 8]) -> Self {
        SimDevice {
            rom,
            memory: Memory::None,
        }
    }

    fn rom_bit(&self, bit: u8) -> bool {
        self.rom[(bit / 8) as usize] & (1 << (bit % 8)) != 0
    }
}

#[derive(Debug)]
enum Mode {
    Idle,
    RomCommand,
    Match(Vec<u8>),
    Function(Option<usize>),
    Search {
        bit: u8,
        step: u8,
        active: Vec<bool>,
    },
    Output(VecDeque<u8>),
}

/// Function command seen by a device: (device index, command, power hold)
pub(crate) type Issued = (usize, u8, bool);

pub(crate) struct SimBus {
    pub(crate) devices: Vec<SimDevice>,
    pub(crate) issued: Vec<Issued>,
    pub(crate) resets: usize,
    mode: Mode,
}

impl SimBus {
    pub(crate) fn new(devices: Vec<SimDevice>) -> Self {
        SimBus {
            devices,
            issued: Vec::new(),
            resets: 0,
            mode: Mode::Idle,
        }
    }

    pub(crate) fn commands_for(&self, rom: [u8; 8]) -> Vec<u8> {
        let index = self.devices.iter().position(|d| d.rom == rom);
        self.issued
            .iter()
            .filter(|(i, _, _)| Some(*i) == index)
            .map(|(_, cmd, _)| *cmd)
            .collect()
    }

    fn function(&mut self, index: usize, cmd: u8, power_hold: bool) -> Mode {
        self.issued.push((index, cmd, power_hold));
        match (cmd, &self.devices[index].memory) {
            (0xBE, Memory::Scratchpad(scratchpad)) => {
                Mode::Output(scratchpad.iter().copied().collect())
            }
            (0xF5, Memory::Status(status)) => Mode::Output([*status].into_iter().collect()),
            _ => Mode::Idle,
        }
    }
}

impl OneWire for SimBus {
    type Error = Infallible;

    fn reset(&mut self, _delay: &mut impl DelayNs) -> Result<bool, Error<Infallible>> {
        self.resets += 1;
        self.mode = Mode::RomCommand;
        Ok(!self.devices.is_empty())
    }

    fn read_bit(&mut self, _delay: &mut impl DelayNs) -> Result<bool, Error<Infallible>> {
        let (bit, step, active) = match &mut self.mode {
            Mode::Search { bit, step, active } => (*bit, step, active.clone()),
            _ => return Ok(true),
        };
        let participants = self
            .devices
            .iter()
            .zip(active.iter())
            .filter(|(_, active)| **active)
            .map(|(device, _)| device.rom_bit(bit));
        let line = match *step {
            0 => {
                *step = 1;
                participants.fold(true, |line, b| line && b)
            }
            1 => {
                *step = 2;
                participants.fold(true, |line, b| line && !b)
            }
            _ => true,
        };
        Ok(line)
    }

    fn write_bit(
        &mut self,
        _delay: &mut impl DelayNs,
        high: bool,
    ) -> Result<(), Error<Infallible>> {
        if let Mode::Search { bit, step, active } = &mut self.mode {
            if *step == 2 {
                for (device, active) in self.devices.iter().zip(active.iter_mut()) {
                    if device.rom_bit(*bit) != high {
                        *active = false;
                    }
                }
                *bit += 1;
                *step = 0;
                if *bit == 64 {
                    self.mode = Mode::Idle;
                }
            }
        }
        Ok(())
    }

    fn read_byte(&mut self, _delay: &mut impl DelayNs) -> Result<u8, Error<Infallible>> {
        Ok(match &mut self.mode {
            Mode::Output(queue) => queue.pop_front().unwrap_or(0xFF),
            _ => 0xFF,
        })
    }

    fn write_byte(
        &mut self,
        _delay: &mut impl DelayNs,
        byte: u8,
        power_hold: bool,
    ) -> Result<(), Error<Infallible>> {
        let mode = core::mem::replace(&mut self.mode, Mode::Idle);
        self.mode = match mode {
            Mode::RomCommand => match byte {
                0x55 => Mode::Match(Vec::new()),
                0xF0 => Mode::Search {
                    bit: 0,
                    step: 0,
                    active: vec![true; self.devices.len()],
                },
                0x33 => Mode::Output(
                    (0..8)
                        .map(|i| self.devices.iter().fold(0xFF, |line, d| line & d.rom[i]))
                        .collect(),
                ),
                _ => Mode::Idle,
            },
            Mode::Match(mut rom) => {
                rom.push(byte);
                if rom.len() == 8 {
                    Mode::Function(self.devices.iter().position(|d| d.rom[..] == rom[..]))
                } else {
                    Mode::Match(rom)
                }
            }
            Mode::Function(Some(index)) => self.function(index, byte, power_hold),
            _ => Mode::Idle,
        };
        Ok(())
    }
}
