//! trionprog-core - Programming FPGA configuration flash over FTDI MPSSE
//!
//! This crate holds everything that does not depend on a particular USB
//! stack: the MPSSE framing and GPIO model, the SPI NOR command set used by
//! the configuration flash, the erase planner, the hex image decoder and the
//! erase/program/verify engine. A backend only has to provide a
//! [`ByteChannel`].
//!
//! # Features
//!
//! - `serde` - Derive serde traits on [`flash::PollPolicy`]
//!
//! # Example
//!
//! ```ignore
//! use trionprog_core::flash::ConfigFlash;
//! use trionprog_core::hex::HexFile;
//! use trionprog_core::mpsse::SpiClock;
//! use trionprog_core::program::{program_hex, NoProgress, ProgramMode};
//!
//! fn flash_image<C: trionprog_core::ByteChannel>(channel: C) -> trionprog_core::Result<()> {
//!     let mut flash = ConfigFlash::new(channel);
//!     flash.init(SpiClock::DEFAULT)?;
//!     flash.wake_up()?;
//!     flash.reset()?;
//!     let report = program_hex(
//!         &mut flash,
//!         &HexFile::new("top.hex"),
//!         0,
//!         ProgramMode::all(),
//!         &mut NoProgress,
//!     )?;
//!     flash.idle()?;
//!     report.result()
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod channel;
pub mod erase;
pub mod error;
pub mod flash;
pub mod hex;
pub mod mpsse;
pub mod program;

pub use channel::ByteChannel;
pub use error::{Error, Result};
