//! MPSSE transport layer
//!
//! Encodes GPIO, clocking and SPI shift instructions for the adapter's
//! MPSSE engine and moves them over a [`ByteChannel`](crate::ByteChannel).

mod clock;
mod frame;
pub mod opcodes;
mod pins;
mod transport;

pub use clock::{SpiClock, BASE_CLOCK_MHZ, MAX_SPI_MHZ, MIN_SPI_MHZ};
pub use frame::{Frame, Payload};
pub use pins::{PinState, Pins};
pub use transport::Transport;

#[cfg(test)]
pub(crate) use transport::tests::RecordingChannel;
