//! FTDI MPSSE byte channel
//!
//! Opens the adapter, puts the chosen interface into MPSSE mode and then
//! gets out of the way: everything after that is raw bytes handed to and
//! from the core.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use ftdi::{find_by_vid_pid, BitMode, Device, Interface};
use trionprog_core::error::{Error as CoreError, Result as CoreResult};
use trionprog_core::mpsse::{Frame, PinState};
use trionprog_core::ByteChannel;

use crate::error::{FtdiError, Result};

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;
/// FT2232H product ID
pub const FT2232H_PID: u16 = 0x6010;

/// Settle time after switching to MPSSE mode
const MPSSE_SETTLE: Duration = Duration::from_millis(50);

/// Pause between empty reads while waiting for a reply
const READ_RETRY_DELAY: Duration = Duration::from_micros(100);

/// FTDI interface (channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FtdiInterface {
    /// Interface A (the only one wired to the FPGA on Trion boards)
    #[default]
    A,
    /// Interface B
    B,
    /// Interface C
    C,
    /// Interface D
    D,
}

impl FtdiInterface {
    /// Parse from a character (A-D, case-insensitive)
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(FtdiInterface::A),
            'B' => Some(FtdiInterface::B),
            'C' => Some(FtdiInterface::C),
            'D' => Some(FtdiInterface::D),
            _ => None,
        }
    }

    /// Get the channel letter
    pub fn letter(&self) -> char {
        match self {
            FtdiInterface::A => 'A',
            FtdiInterface::B => 'B',
            FtdiInterface::C => 'C',
            FtdiInterface::D => 'D',
        }
    }

    fn to_ftdi(self) -> Interface {
        match self {
            FtdiInterface::A => Interface::A,
            FtdiInterface::B => Interface::B,
            FtdiInterface::C => Interface::C,
            FtdiInterface::D => Interface::D,
        }
    }
}

/// Configuration for opening the adapter
#[derive(Debug, Clone)]
pub struct FtdiConfig {
    /// USB vendor ID
    pub vid: u16,
    /// USB product ID
    pub pid: u16,
    /// Interface/channel to use
    pub interface: FtdiInterface,
    /// USB latency timer in milliseconds
    pub latency_ms: u8,
    /// Empty reads tolerated before a reply counts as short
    pub read_retries: u32,
}

impl Default for FtdiConfig {
    fn default() -> Self {
        FtdiConfig {
            vid: FTDI_VID,
            pid: FT2232H_PID,
            interface: FtdiInterface::default(),
            latency_ms: 2,
            read_retries: 10_000,
        }
    }
}

impl FtdiConfig {
    /// Match a different USB VID/PID
    pub fn usb_id(mut self, vid: u16, pid: u16) -> Self {
        self.vid = vid;
        self.pid = pid;
        self
    }

    /// Set the interface/channel
    pub fn interface(mut self, interface: FtdiInterface) -> Self {
        self.interface = interface;
        self
    }

    /// Set the USB latency timer
    pub fn latency(mut self, latency_ms: u8) -> Result<Self> {
        if latency_ms == 0 {
            return Err(FtdiError::InvalidParameter(
                "latency timer must be at least 1 ms".to_string(),
            ));
        }
        self.latency_ms = latency_ms;
        Ok(self)
    }
}

/// Open MPSSE session on an FTDI adapter
pub struct FtdiChannel {
    device: Device,
    read_retries: u32,
}

impl FtdiChannel {
    /// Open the adapter and switch it to MPSSE mode
    pub fn open(config: &FtdiConfig) -> Result<Self> {
        log::info!(
            "Opening FTDI {:04X}:{:04X} channel {}",
            config.vid,
            config.pid,
            config.interface.letter()
        );

        let mut device = find_by_vid_pid(config.vid, config.pid)
            .interface(config.interface.to_ftdi())
            .open()
            .map_err(|source| FtdiError::OpenFailed {
                vid: config.vid,
                pid: config.pid,
                source,
            })?;

        device
            .usb_reset()
            .map_err(|source| FtdiError::ConfigFailed {
                step: "reset USB device",
                source,
            })?;

        device
            .set_latency_timer(config.latency_ms)
            .map_err(|source| FtdiError::ConfigFailed {
                step: "set latency timer",
                source,
            })?;

        device
            .set_bitmode(0x00, BitMode::Reset)
            .map_err(|source| FtdiError::ConfigFailed {
                step: "reset bit mode",
                source,
            })?;

        device
            .set_bitmode(0x00, BitMode::Mpsse)
            .map_err(|source| FtdiError::ConfigFailed {
                step: "enter MPSSE mode",
                source,
            })?;

        thread::sleep(MPSSE_SETTLE);
        log::debug!("FTDI channel {} in MPSSE mode", config.interface.letter());

        Ok(FtdiChannel {
            device,
            read_retries: config.read_retries,
        })
    }

    /// Open channel A of the first FT2232H
    pub fn open_default() -> Result<Self> {
        Self::open(&FtdiConfig::default())
    }

    /// Release every pin so the FPGA can boot from the flash
    fn release_pins(&mut self) -> Result<()> {
        let mut frame = Frame::with_capacity(3);
        frame.set_pins(PinState::IDLE);
        self.device
            .write_all(frame.as_bytes())
            .map_err(FtdiError::TransferFailed)
    }
}

impl ByteChannel for FtdiChannel {
    fn write(&mut self, data: &[u8]) -> CoreResult<usize> {
        self.device.write_all(data).map_err(|e| {
            log::error!("FTDI write of {} bytes failed: {}", data.len(), e);
            CoreError::from(FtdiError::TransferFailed(e))
        })?;
        log::trace!("Sent {} bytes", data.len());
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> CoreResult<usize> {
        let mut total = 0;
        let mut idle = 0;

        while total < buf.len() {
            match self.device.read(&mut buf[total..]) {
                Ok(0) => {
                    idle += 1;
                    if idle > self.read_retries {
                        log::warn!("FTDI read stalled at {} of {} bytes", total, buf.len());
                        break;
                    }
                    thread::sleep(READ_RETRY_DELAY);
                }
                Ok(n) => {
                    total += n;
                    idle = 0;
                }
                Err(e) => {
                    log::error!("FTDI read failed: {}", e);
                    return Err(FtdiError::TransferFailed(e).into());
                }
            }
        }

        log::trace!("Received {} bytes", total);
        Ok(total)
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }
}

impl Drop for FtdiChannel {
    fn drop(&mut self) {
        if let Err(e) = self.release_pins() {
            log::warn!("Failed to release pins on close: {}", e);
        }
    }
}
