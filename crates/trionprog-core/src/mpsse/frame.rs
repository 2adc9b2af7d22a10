//! MPSSE command frame builder
//!
//! A frame is the byte stream sent to the adapter in one write. Each method
//! appends one typed MPSSE instruction, so callers never compute offsets.

use super::opcodes::*;
use super::pins::PinState;
use crate::error::{Error, Result};

/// Data phase of a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Shift out these bytes
    Buffer(&'a [u8]),
    /// Shift out the same byte `len` times
    Fill(u8),
}

impl Payload<'_> {
    /// Byte that goes on the wire at position `i`
    fn byte_at(&self, i: usize) -> u8 {
        match self {
            Payload::Buffer(data) => data[i],
            Payload::Fill(b) => *b,
        }
    }
}

/// MPSSE command frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<u8>,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty frame with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Frame {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Set low GPIO levels and directions
    pub fn set_pins(&mut self, state: PinState) -> &mut Self {
        self.buf.push(SET_BITS_LOW);
        self.buf.push(state.levels.bits());
        self.buf.push(state.directions.bits());
        self
    }

    /// Set the clock divisor and force plain synchronous clocking
    pub fn clock_divisor(&mut self, divisor: u16) -> &mut Self {
        self.buf.push(TCK_DIVISOR);
        self.buf.extend_from_slice(&divisor.to_le_bytes());
        self.buf.push(DIS_ADAPTIVE);
        self.buf.push(DIS_3_PHASE);
        self
    }

    /// Append only the header of a shift of `len` bytes
    ///
    /// The data bytes must follow, either later in this frame or in
    /// subsequent writes.
    pub fn shift_header(&mut self, len: usize, capture: bool) -> Result<&mut Self> {
        if len == 0 || len > MAX_SHIFT_LEN {
            return Err(Error::InvalidLength);
        }
        let count = (len - 1) as u16;
        self.buf.push(shift_opcode(capture));
        self.buf.extend_from_slice(&count.to_le_bytes());
        Ok(self)
    }

    /// Append a complete shift of `len` bytes of `payload`
    ///
    /// A `Payload::Buffer` must hold at least `len` bytes.
    pub fn shift(&mut self, payload: Payload<'_>, len: usize, capture: bool) -> Result<&mut Self> {
        if let Payload::Buffer(data) = payload {
            if data.len() < len {
                return Err(Error::InvalidLength);
            }
        }
        self.shift_header(len, capture)?;
        self.buf.extend((0..len).map(|i| payload.byte_at(i)));
        Ok(self)
    }

    /// Ask the adapter to flush any pending read data
    pub fn send_immediate(&mut self) -> &mut Self {
        self.buf.push(SEND_IMMEDIATE);
        self
    }

    /// Framed bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of framed bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been framed
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
