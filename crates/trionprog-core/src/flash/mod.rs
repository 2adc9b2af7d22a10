//! SPI flash command protocol

mod chip;
mod commands;
pub mod opcodes;
mod poll;

pub use chip::{ChipInfo, KNOWN_CHIPS};
pub use commands::ConfigFlash;
pub use poll::{BusyOp, PollPolicy};
