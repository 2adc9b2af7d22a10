//! Byte channel trait
//!
//! The byte channel is the only thing the core needs from a backend: a
//! blocking duplex pipe to the adapter's MPSSE engine. Opening the device,
//! selecting the interface and switching bit modes all happen before a
//! channel is handed to the core.

use crate::error::Result;

/// Duplex byte connection to an MPSSE adapter
///
/// Both `write` and `read` block. Neither applies a timeout of its own;
/// callers compare the returned count against what they asked for and treat
/// any difference as a transport failure.
pub trait ByteChannel {
    /// Write `data` to the adapter, returning the number of bytes accepted
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read into `buf`, returning the number of bytes received
    ///
    /// Implementations should keep reading until `buf` is full or the
    /// adapter has nothing more to send.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

// Lets a backend be picked at runtime
impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpsse::RecordingChannel;

    fn send_one(channel: &mut dyn ByteChannel) -> Result<usize> {
        channel.write(&[0x87])
    }

    #[test]
    fn test_boxed_and_borrowed_channels_forward() {
        let mut boxed: Box<dyn ByteChannel + Send> = Box::new(RecordingChannel::default());
        assert_eq!(send_one(&mut boxed).unwrap(), 1);
        boxed.delay_us(10);

        let mut inner = RecordingChannel::default();
        inner.replies.extend([0x42]);
        let mut borrowed = &mut inner;
        let mut buf = [0u8; 1];
        assert_eq!(ByteChannel::read(&mut borrowed, &mut buf).unwrap(), 1);
        assert_eq!(buf, [0x42]);
        assert_eq!(send_one(&mut borrowed).unwrap(), 1);
        assert_eq!(inner.writes, vec![vec![0x87]]);
    }
}
