//! MPSSE engine model
//!
//! Decodes the command stream the core writes, one byte at a time, so a
//! command split over several writes (the constant-fill path) parses the
//! same as one sent whole. Shifted bytes go to the [`SimFlash`] while chip
//! select is low; captured MISO bytes queue up for the next read.

use std::collections::VecDeque;

use trionprog_core::error::{Error, Result};
use trionprog_core::mpsse::{opcodes, PinState, Pins};
use trionprog_core::ByteChannel;

use crate::chip::SimFlash;

#[derive(Debug, Clone, Copy)]
enum Parse {
    Opcode,
    Args { opcode: u8, first: Option<u8> },
    Shift { capture: bool, remaining: usize },
}

/// Simulated FT2232H channel A with a flash chip on its SPI pins
pub struct SimAdapter {
    flash: SimFlash,
    pins: PinState,
    divisor: Option<u16>,
    parse: Parse,
    miso: VecDeque<u8>,
    write_calls: usize,
    reset_pulses: usize,
    delayed_us: u64,
}

impl SimAdapter {
    /// Put `flash` behind a freshly opened adapter
    pub fn new(flash: SimFlash) -> Self {
        Self {
            flash,
            pins: PinState::IDLE,
            divisor: None,
            parse: Parse::Opcode,
            miso: VecDeque::new(),
            write_calls: 0,
            reset_pulses: 0,
            delayed_us: 0,
        }
    }

    /// The simulated chip
    pub fn flash(&self) -> &SimFlash {
        &self.flash
    }

    /// Mutable access to the simulated chip
    pub fn flash_mut(&mut self) -> &mut SimFlash {
        &mut self.flash
    }

    /// Last GPIO state written
    pub fn pins(&self) -> PinState {
        self.pins
    }

    /// Last clock divisor written
    pub fn divisor(&self) -> Option<u16> {
        self.divisor
    }

    /// Number of `write` calls so far
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Times CRESET_N has been driven low
    pub fn reset_pulses(&self) -> usize {
        self.reset_pulses
    }

    /// Sum of all requested delays
    pub fn delayed_us(&self) -> u64 {
        self.delayed_us
    }

    /// Whether the flash sees chip select asserted
    pub fn is_selected(&self) -> bool {
        is_selected(self.pins)
    }

    /// Whether the FPGA is held in reset
    pub fn fpga_in_reset(&self) -> bool {
        in_reset(self.pins)
    }

    fn feed(&mut self, byte: u8) -> Result<()> {
        self.parse = match self.parse {
            Parse::Opcode => match byte {
                opcodes::SET_BITS_LOW | opcodes::TCK_DIVISOR => Parse::Args {
                    opcode: byte,
                    first: None,
                },
                op if op == opcodes::shift_opcode(false) || op == opcodes::shift_opcode(true) => {
                    Parse::Args {
                        opcode: byte,
                        first: None,
                    }
                }
                opcodes::DIS_ADAPTIVE | opcodes::DIS_3_PHASE | opcodes::SEND_IMMEDIATE => {
                    Parse::Opcode
                }
                other => {
                    log::warn!("sim: unsupported MPSSE opcode 0x{:02X}", other);
                    return Err(Error::TransferFailed);
                }
            },
            Parse::Args {
                opcode,
                first: None,
            } => Parse::Args {
                opcode,
                first: Some(byte),
            },
            Parse::Args {
                opcode,
                first: Some(first),
            } => self.execute(opcode, first, byte),
            Parse::Shift { capture, remaining } => {
                let miso = if self.is_selected() {
                    self.flash.exchange(byte)
                } else {
                    0xFF
                };
                if capture {
                    self.miso.push_back(miso);
                }
                if remaining > 1 {
                    Parse::Shift {
                        capture,
                        remaining: remaining - 1,
                    }
                } else {
                    Parse::Opcode
                }
            }
        };
        Ok(())
    }

    fn execute(&mut self, opcode: u8, first: u8, second: u8) -> Parse {
        match opcode {
            opcodes::SET_BITS_LOW => {
                self.set_pins(PinState {
                    levels: Pins::from_bits_retain(first),
                    directions: Pins::from_bits_retain(second),
                });
                Parse::Opcode
            }
            opcodes::TCK_DIVISOR => {
                self.divisor = Some(u16::from_le_bytes([first, second]));
                Parse::Opcode
            }
            _ => Parse::Shift {
                capture: opcode & opcodes::MPSSE_DO_READ != 0,
                remaining: u16::from_le_bytes([first, second]) as usize + 1,
            },
        }
    }

    fn set_pins(&mut self, state: PinState) {
        let was_selected = is_selected(self.pins);
        let was_in_reset = in_reset(self.pins);
        self.pins = state;

        match (was_selected, is_selected(state)) {
            (false, true) => self.flash.select(),
            (true, false) => self.flash.deselect(),
            _ => {}
        }
        if !was_in_reset && in_reset(state) {
            self.reset_pulses += 1;
        }
    }
}

fn is_selected(state: PinState) -> bool {
    state.directions.contains(Pins::SS_N) && !state.levels.contains(Pins::SS_N)
}

fn in_reset(state: PinState) -> bool {
    state.directions.contains(Pins::CRESET_N) && !state.levels.contains(Pins::CRESET_N)
}

impl ByteChannel for SimAdapter {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.write_calls += 1;
        for &byte in data {
            self.feed(byte)?;
        }
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len().min(self.miso.len());
        for (slot, byte) in buf.iter_mut().zip(self.miso.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }

    fn delay_us(&mut self, us: u32) {
        self.delayed_us += us as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::SimConfig;

    fn adapter() -> SimAdapter {
        SimAdapter::new(SimFlash::new(SimConfig::default()))
    }

    #[test]
    fn test_clock_setup_is_parsed() {
        let mut sim = adapter();
        sim.write(&[0x86, 0x02, 0x00, 0x97, 0x8D, 0x87]).unwrap();
        assert_eq!(sim.divisor(), Some(2));
    }

    #[test]
    fn test_split_fill_shift() {
        let mut sim = adapter();
        sim.write(&[0x80, 0x10, 0x1B, 0x11, 0x00, 0x00, 0x05]).unwrap();
        assert!(sim.is_selected());
        sim.write(&[0x31, 0x00, 0x00]).unwrap();
        sim.write(&[0x00]).unwrap();
        sim.write(&[0x80, 0x18, 0x1B]).unwrap();

        let mut status = [0xAAu8; 2];
        assert_eq!(sim.read(&mut status).unwrap(), 1);
        assert_eq!(status[0], 0x00);
        assert!(!sim.is_selected());
    }

    #[test]
    fn test_unknown_opcode_fails() {
        let mut sim = adapter();
        assert_eq!(sim.write(&[0x42]), Err(Error::TransferFailed));
    }

    #[test]
    fn test_idle_pins_deselect() {
        let mut sim = adapter();
        sim.write(&[0x80, 0x00, 0x1B]).unwrap();
        assert!(sim.is_selected());
        assert!(sim.fpga_in_reset());
        sim.write(&[0x80, 0x18, 0x00]).unwrap();
        assert!(!sim.is_selected());
        assert!(!sim.fpga_in_reset());
        assert_eq!(sim.reset_pulses(), 1);
    }
}
