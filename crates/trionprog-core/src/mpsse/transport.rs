//! MPSSE transport
//!
//! Owns the byte channel and the cached GPIO state for one adapter
//! session. Every call is one blocking round trip: the framed bytes are
//! written, then the reply (if any) is read back in full. Nothing is
//! buffered between calls.

use super::frame::{Frame, Payload};
use super::pins::PinState;
use crate::channel::ByteChannel;
use crate::error::{Error, Result};

/// MPSSE transport over a byte channel
pub struct Transport<C> {
    channel: C,
    pins: PinState,
}

impl<C: ByteChannel> Transport<C> {
    /// Wrap an already opened channel
    ///
    /// Nothing is written yet; the cached pin state starts out as
    /// [`PinState::IDLE`].
    pub fn new(channel: C) -> Self {
        Transport {
            channel,
            pins: PinState::IDLE,
        }
    }

    /// Last pin state written to the adapter
    pub fn pins(&self) -> PinState {
        self.pins
    }

    /// Record `state` as the current pin state without emitting anything
    ///
    /// Used when a frame carries its own set-pins instructions.
    pub fn cache_pins(&mut self, state: PinState) {
        self.pins = state;
    }

    /// Set all low GPIO levels and directions in one instruction
    pub fn set_pins(&mut self, state: PinState) -> Result<()> {
        log::trace!(
            "set pins: levels=0x{:02X} dirs=0x{:02X}",
            state.levels.bits(),
            state.directions.bits()
        );
        self.pins = state;
        let mut frame = Frame::with_capacity(3);
        frame.set_pins(state);
        self.write_exact(frame.as_bytes())
    }

    /// Configure the SPI clock to `60 MHz / (divisor + 1)`
    ///
    /// Adaptive and 3-phase clocking are always switched off.
    pub fn set_clock_divisor(&mut self, divisor: u16) -> Result<()> {
        log::debug!("Setting clock divisor to {}", divisor);
        let mut frame = Frame::with_capacity(6);
        frame.clock_divisor(divisor).send_immediate();
        self.write_exact(frame.as_bytes())
    }

    /// Shift `len` bytes out without reading anything back
    pub fn shift(&mut self, payload: Payload<'_>, len: usize) -> Result<()> {
        self.shift_inner(payload, len, None)
    }

    /// Shift `buf.len()` bytes out while capturing the same number in
    pub fn shift_in(&mut self, payload: Payload<'_>, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        self.shift_inner(payload, len, Some(buf))
    }

    fn shift_inner(
        &mut self,
        payload: Payload<'_>,
        len: usize,
        read_buf: Option<&mut [u8]>,
    ) -> Result<()> {
        let capture = read_buf.is_some();
        match payload {
            Payload::Buffer(_) => {
                let mut frame = Frame::with_capacity(3 + len);
                frame.shift(payload, len, capture)?;
                self.write_exact(frame.as_bytes())?;
            }
            Payload::Fill(byte) => {
                // Constant fill goes out one byte per write after the header
                let mut frame = Frame::with_capacity(3);
                frame.shift_header(len, capture)?;
                self.write_exact(frame.as_bytes())?;
                for _ in 0..len {
                    self.write_exact(&[byte])?;
                }
            }
        }

        match read_buf {
            Some(buf) => self.read_exact(buf),
            None => Ok(()),
        }
    }

    /// Write a whole frame, then read exactly `read_buf.len()` bytes
    pub fn submit(&mut self, frame: &Frame, read_buf: &mut [u8]) -> Result<()> {
        self.write_exact(frame.as_bytes())?;
        if read_buf.is_empty() {
            Ok(())
        } else {
            self.read_exact(read_buf)
        }
    }

    /// Delay for the specified number of microseconds
    pub fn delay_us(&mut self, us: u32) {
        self.channel.delay_us(us)
    }

    /// Borrow the underlying channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Give the channel back
    pub fn into_inner(self) -> C {
        self.channel
    }

    fn write_exact(&mut self, data: &[u8]) -> Result<()> {
        let written = self.channel.write(data)?;
        if written != data.len() {
            log::debug!("Short write: {} of {} bytes", written, data.len());
            return Err(Error::ShortWrite {
                expected: data.len(),
                written,
            });
        }
        log::trace!("Sent {} bytes", written);
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let read = self.channel.read(buf)?;
        if read != buf.len() {
            log::debug!("Short read: {} of {} bytes", read, buf.len());
            return Err(Error::ShortRead {
                expected: buf.len(),
                read,
            });
        }
        log::trace!("Received {} bytes", read);
        Ok(())
    }
}
