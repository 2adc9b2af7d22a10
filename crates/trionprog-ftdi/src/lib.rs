//! trionprog-ftdi - FTDI MPSSE byte channel
//!
//! Provides [`FtdiChannel`], a [`ByteChannel`](trionprog_core::ByteChannel)
//! over libftdi. Opening the channel resets the USB device, sets the latency
//! timer, cycles the bit mode through RESET into MPSSE and waits for the
//! engine to settle. Dropping it releases all pins, which lets the FPGA load
//! its configuration.
//!
//! # Example
//!
//! ```no_run
//! use trionprog_core::flash::ConfigFlash;
//! use trionprog_core::mpsse::SpiClock;
//! use trionprog_ftdi::{FtdiChannel, FtdiConfig, FtdiInterface};
//!
//! let config = FtdiConfig::default().interface(FtdiInterface::A).latency(2)?;
//! let mut flash = ConfigFlash::new(FtdiChannel::open(&config)?);
//! flash.init(SpiClock::DEFAULT)?;
//! flash.wake_up()?;
//! println!("Device ID: 0x{:04X}", flash.read_device_id()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;

pub use device::{FtdiChannel, FtdiConfig, FtdiInterface, FT2232H_PID, FTDI_VID};
pub use error::{FtdiError, Result};
