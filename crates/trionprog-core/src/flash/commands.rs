//! Configuration flash command protocol
//!
//! Every logical flash command is bracketed by chip select: the frame
//! asserts SS_N, shifts the opcode (and address and data), deasserts SS_N
//! and flushes, all in a single write to the adapter. Mutating commands are
//! preceded by Write Enable and followed by a status poll.
//!
//! A failed call leaves the flash and bus in whatever state the partial
//! sequence produced. Nothing is rolled back.

use super::opcodes;
use super::poll::{BusyOp, PollPolicy};
use crate::channel::ByteChannel;
use crate::erase::EraseSize;
use crate::error::{Error, Result};
use crate::mpsse::{opcodes::MAX_SHIFT_LEN, Frame, Payload, PinState, Pins, SpiClock, Transport};

/// Configuration flash behind an MPSSE adapter
pub struct ConfigFlash<C> {
    transport: Transport<C>,
    poll: PollPolicy,
    /// Levels driven while the pins are under our control
    gpio: Pins,
}

impl<C: ByteChannel> ConfigFlash<C> {
    /// Wrap a channel with the default poll policy
    pub fn new(channel: C) -> Self {
        Self::with_policy(channel, PollPolicy::default())
    }

    /// Wrap a channel with an explicit poll policy
    pub fn with_policy(channel: C, poll: PollPolicy) -> Self {
        ConfigFlash {
            transport: Transport::new(channel),
            poll,
            gpio: Pins::SS_N | Pins::CRESET_N,
        }
    }

    /// Release the pins and set the SPI clock
    ///
    /// The pins are left idle so the FPGA is not disturbed until the first
    /// flash command.
    pub fn init(&mut self, clock: SpiClock) -> Result<()> {
        log::debug!(
            "Initialising adapter: divisor {} ({:.2} MHz)",
            clock.divisor(),
            clock.mhz()
        );
        self.idle()?;
        self.transport.set_clock_divisor(clock.divisor())?;
        self.idle()
    }

    /// Set every pin to input
    ///
    /// The cached levels are kept, so the next command drives the same
    /// reset level as before.
    pub fn idle(&mut self) -> Result<()> {
        self.transport.set_pins(PinState::IDLE)
    }

    /// Active poll policy
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Replace the poll policy
    pub fn set_poll_policy(&mut self, poll: PollPolicy) {
        self.poll = poll;
    }

    /// Borrow the transport
    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut Transport<C> {
        &mut self.transport
    }

    /// Give the channel back
    pub fn into_inner(self) -> C {
        self.transport.into_inner()
    }

    fn driven(&self) -> PinState {
        PinState::driven(self.gpio)
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    /// Send a single-byte command
    pub fn write_command(&mut self, opcode: u8) -> Result<()> {
        log::trace!("command 0x{:02X}", opcode);
        let state = self.driven();
        let mut frame = Frame::with_capacity(11);
        frame.set_pins(state.selected());
        frame.shift(Payload::Buffer(&[opcode]), 1, false)?;
        frame.set_pins(state.deselected()).send_immediate();

        self.transport.cache_pins(state.deselected());
        self.transport.submit(&frame, &mut [])
    }

    /// Send a command with a 24-bit address and an optional data phase
    ///
    /// When `size > 0`, `size` bytes of `data` follow the address. With
    /// `read_buf` present they are clocked with read-back and the reply is
    /// stored in `read_buf[..size]`. Addresses above 24 bits are masked.
    pub fn command_with_address(
        &mut self,
        opcode: u8,
        addr: u32,
        data: Payload<'_>,
        size: usize,
        read_buf: Option<&mut [u8]>,
    ) -> Result<()> {
        log::trace!(
            "command 0x{:02X} addr 0x{:06X} size {}",
            opcode,
            addr & opcodes::ADDRESS_MASK,
            size
        );
        if let Some(buf) = &read_buf {
            if buf.len() < size {
                return Err(Error::InvalidLength);
            }
        }

        let header = command_header(opcode, addr);
        let state = self.driven();
        let mut frame = Frame::with_capacity(14 + if size > 0 { size + 3 } else { 0 });
        frame.set_pins(state.selected());
        frame.shift(Payload::Buffer(&header), header.len(), false)?;
        if size > 0 {
            frame.shift(data, size, read_buf.is_some())?;
        }
        frame.set_pins(state.deselected()).send_immediate();

        self.transport.cache_pins(state.deselected());
        match read_buf {
            Some(buf) => self.transport.submit(&frame, &mut buf[..size]),
            None => self.transport.submit(&frame, &mut []),
        }
    }

    /// Send a command and read `buf.len()` bytes back, no address
    fn command_read(&mut self, opcode: u8, buf: &mut [u8]) -> Result<()> {
        let state = self.driven();
        let mut frame = Frame::with_capacity(14 + buf.len());
        frame.set_pins(state.selected());
        frame.shift(Payload::Buffer(&[opcode]), 1, false)?;
        frame.shift(Payload::Fill(0), buf.len(), true)?;
        frame.set_pins(state.deselected()).send_immediate();

        self.transport.cache_pins(state.deselected());
        self.transport.submit(&frame, buf)
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    /// Send the Write Enable command
    pub fn write_enable(&mut self) -> Result<()> {
        self.write_command(opcodes::WREN)
    }

    /// Software reset (Reset Enable followed by Reset)
    pub fn reset(&mut self) -> Result<()> {
        self.write_command(opcodes::RSTEN)?;
        self.write_command(opcodes::RST)
    }

    /// Release the flash from deep power-down
    ///
    /// The FPGA puts its configuration memory to sleep once it has booted.
    pub fn wake_up(&mut self) -> Result<()> {
        self.write_command(opcodes::RES)
    }

    /// Read status register 1
    pub fn read_status(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.command_read(opcodes::RDSR, &mut buf)?;
        Ok(buf[0])
    }

    /// Wait for the Write In Progress bit to clear
    ///
    /// Chip select is asserted once and the status opcode sent once; each
    /// poll then clocks in one more status byte after waiting
    /// `interval_us`. Fails with [`Error::Timeout`] if the flash is still
    /// busy after `max_attempts` polls.
    pub fn poll_until_ready(&mut self, max_attempts: u32) -> Result<()> {
        let state = self.driven();
        self.transport.set_pins(state.selected())?;

        let polled = self.poll_selected(max_attempts);
        let released = self.transport.set_pins(state.deselected());

        let attempts = polled?;
        released?;
        match attempts {
            Some(n) => {
                log::trace!("ready after {} polls", n);
                Ok(())
            }
            None => {
                log::debug!(
                    "Flash still busy after {} polls of {} us",
                    max_attempts,
                    self.poll.interval_us
                );
                Err(Error::Timeout)
            }
        }
    }

    /// Poll with chip select already asserted; the number of polls it took,
    /// or `None` if the budget ran out
    fn poll_selected(&mut self, max_attempts: u32) -> Result<Option<u32>> {
        self.transport.shift(Payload::Buffer(&[opcodes::RDSR]), 1)?;

        let mut status = [0u8; 1];
        for attempt in 1..=max_attempts {
            self.transport.delay_us(self.poll.interval_us);
            self.transport.shift_in(Payload::Fill(0), &mut status)?;
            if status[0] & opcodes::SR1_WIP == 0 {
                return Ok(Some(attempt));
            }
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Identification
    // ------------------------------------------------------------------

    /// Read the manufacturer/device ID
    ///
    /// The manufacturer byte ends up in the low half, so a GigaDevice
    /// GD25Q80E reads as `0x13C8`.
    pub fn read_device_id(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.command_with_address(opcodes::REMS, 0, Payload::Fill(0), 2, Some(&mut buf))?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read the 128-bit factory unique ID
    pub fn read_unique_id(&mut self) -> Result<[u8; opcodes::UNIQUE_ID_LEN]> {
        let mut uid = [0u8; opcodes::UNIQUE_ID_LEN];
        self.command_with_address(
            opcodes::RDUID,
            0,
            Payload::Fill(0),
            uid.len(),
            Some(&mut uid),
        )?;
        Ok(uid)
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let chunk_len = core::cmp::min(MAX_SHIFT_LEN, buf.len() - offset);
            let chunk = &mut buf[offset..offset + chunk_len];
            self.command_with_address(
                opcodes::READ,
                addr.wrapping_add(offset as u32),
                Payload::Fill(0),
                chunk_len,
                Some(chunk),
            )?;
            offset += chunk_len;
        }
        Ok(())
    }

    /// Program up to one page
    ///
    /// The flash wraps within the 256-byte page, so at most
    /// `256 - (addr & 255)` bytes land sequentially.
    pub fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.len() > opcodes::PAGE_SIZE {
            return Err(Error::InvalidLength);
        }
        self.write_enable()?;
        self.command_with_address(opcodes::PP, addr, Payload::Buffer(data), data.len(), None)?;
        self.wait_for(BusyOp::PageProgram)
    }

    // ------------------------------------------------------------------
    // Erase
    // ------------------------------------------------------------------

    /// Erase the sector or block of `size` containing `addr`
    pub fn erase(&mut self, size: EraseSize, addr: u32) -> Result<()> {
        self.write_enable()?;
        self.command_with_address(size.opcode(), addr, Payload::Fill(0), 0, None)?;
        self.wait_for(size.busy_op())
    }

    /// Erase the whole chip
    pub fn erase_all(&mut self) -> Result<()> {
        self.write_enable()?;
        self.write_command(opcodes::CE_60)?;
        self.wait_for(BusyOp::ChipErase)
    }

    fn wait_for(&mut self, op: BusyOp) -> Result<()> {
        self.poll_until_ready(self.poll.attempts_for(op))
    }

    // ------------------------------------------------------------------
    // FPGA control
    // ------------------------------------------------------------------

    /// Drive CRESET_N low (`true`) or high (`false`)
    pub fn set_fpga_reset(&mut self, reset: bool) -> Result<()> {
        self.gpio.set(Pins::CRESET_N, !reset);
        self.transport.set_pins(self.driven())
    }

    /// Hold the FPGA in reset and bring the flash back to a known state
    ///
    /// The FPGA stays in reset while the pins are driven; it starts loading
    /// its configuration once the session releases them with [`idle`].
    ///
    /// [`idle`]: ConfigFlash::idle
    pub fn reconfigure_fpga(&mut self, settle_us: u32) -> Result<()> {
        self.set_fpga_reset(true)?;
        self.transport.delay_us(settle_us);
        self.wake_up()?;
        self.reset()
    }
}

/// Opcode followed by the big-endian 24-bit address
fn command_header(opcode: u8, addr: u32) -> [u8; 4] {
    let [_, hi, mid, lo] = (addr & opcodes::ADDRESS_MASK).to_be_bytes();
    [opcode, hi, mid, lo]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpsse::RecordingChannel;

    fn flash() -> ConfigFlash<RecordingChannel> {
        ConfigFlash::new(RecordingChannel::default())
    }

    #[test]
    fn test_command_header_masks_address() {
        assert_eq!(command_header(0x03, 0x0112_3456), [0x03, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_write_enable_is_one_bracketed_frame() {
        let mut f = flash();
        f.write_enable().unwrap();
        let writes = &f.transport().channel().writes;
        assert_eq!(
            writes,
            &vec![vec![
                0x80, 0x10, 0x1B, 0x11, 0x00, 0x00, 0x06, 0x80, 0x18, 0x1B, 0x87
            ]]
        );
    }

    #[test]
    fn test_sector_erase_frames() {
        let mut f = flash();
        f.transport_mut().channel_mut().replies.extend([0x00]);
        f.erase(EraseSize::Sector4K, 0x012345).unwrap();

        let writes = &f.transport().channel().writes;
        // WREN, erase, select, RDSR opcode, poll header, poll byte, deselect
        assert_eq!(writes.len(), 7);
        assert_eq!(
            writes[1],
            vec![
                0x80, 0x10, 0x1B, 0x11, 0x03, 0x00, 0x20, 0x01, 0x23, 0x45, 0x80, 0x18, 0x1B, 0x87
            ]
        );
        assert_eq!(writes[2], vec![0x80, 0x10, 0x1B]);
        assert_eq!(writes[3], vec![0x11, 0x00, 0x00, 0x05]);
        assert_eq!(writes[6], vec![0x80, 0x18, 0x1B]);
    }

    #[test]
    fn test_read_bytes_frame_and_reply() {
        let mut f = flash();
        f.transport_mut()
            .channel_mut()
            .replies
            .extend([0xDE, 0xAD, 0xBE]);
        let mut buf = [0u8; 3];
        f.read_bytes(0x000100, &mut buf).unwrap();

        assert_eq!(buf, [0xDE, 0xAD, 0xBE]);
        let writes = &f.transport().channel().writes;
        assert_eq!(
            writes[0],
            vec![
                0x80, 0x10, 0x1B, 0x11, 0x03, 0x00, 0x03, 0x00, 0x01, 0x00, 0x31, 0x02, 0x00, 0x00,
                0x00, 0x00, 0x80, 0x18, 0x1B, 0x87
            ]
        );
    }

    #[test]
    fn test_device_id_byte_order() {
        let mut f = flash();
        f.transport_mut().channel_mut().replies.extend([0xC8, 0x13]);
        assert_eq!(f.read_device_id().unwrap(), 0x13C8);
    }

    #[test]
    fn test_poll_times_out_after_budget() {
        let mut f = ConfigFlash::with_policy(
            RecordingChannel::default(),
            PollPolicy {
                max_attempts: 5,
                interval_us: 1000,
            },
        );
        f.transport_mut().channel_mut().replies.extend([0x01; 10]);

        assert_eq!(f.poll_until_ready(5), Err(Error::Timeout));
        let chan = f.transport().channel();
        assert_eq!(chan.delays, vec![1000; 5]);
        // Chip select released after giving up
        assert_eq!(chan.writes.last(), Some(&vec![0x80, 0x18, 0x1B]));
        // Five bytes consumed, the rest untouched
        assert_eq!(chan.replies.len(), 5);
    }

    #[test]
    fn test_poll_stops_when_ready() {
        let mut f = flash();
        f.transport_mut()
            .channel_mut()
            .replies
            .extend([0x03, 0x01, 0x00, 0x01]);
        f.poll_until_ready(20).unwrap();
        assert_eq!(f.transport().channel().delays.len(), 3);
        assert_eq!(f.transport().channel().replies.len(), 1);
    }

    #[test]
    fn test_block_erase_gets_scaled_budget() {
        let policy = PollPolicy {
            max_attempts: 2,
            interval_us: 10,
        };
        let mut f = ConfigFlash::with_policy(RecordingChannel::default(), policy);
        f.transport_mut().channel_mut().replies.extend([0x01; 150]);
        f.transport_mut().channel_mut().replies.push_back(0x00);
        f.erase(EraseSize::Block64K, 0x10000).unwrap();
        assert_eq!(f.transport().channel().delays.len(), 151);

        // A page program only gets the base budget
        f.transport_mut().channel_mut().replies.extend([0x01; 3]);
        assert_eq!(f.write_page(0, &[0xA5]), Err(Error::Timeout));
        assert_eq!(f.transport().channel().delays.len(), 153);
    }

    #[test]
    fn test_write_page_rejects_oversize() {
        let mut f = flash();
        assert_eq!(f.write_page(0, &[0u8; 257]), Err(Error::InvalidLength));
        assert!(f.transport().channel().writes.is_empty());
    }

    #[test]
    fn test_fpga_reset_is_kept_in_later_commands() {
        let mut f = flash();
        f.set_fpga_reset(true).unwrap();
        f.idle().unwrap();
        f.write_enable().unwrap();

        let writes = &f.transport().channel().writes;
        assert_eq!(writes[0], vec![0x80, 0x08, 0x1B]);
        assert_eq!(writes[1], vec![0x80, 0x18, 0x00]);
        // Select asserted with reset still held low
        assert_eq!(&writes[2][..3], &[0x80, 0x00, 0x1B]);
        assert_eq!(&writes[2][7..10], &[0x80, 0x08, 0x1B]);
    }

    #[test]
    fn test_init_sequence() {
        let mut f = flash();
        f.init(SpiClock::from_divisor(2)).unwrap();
        assert_eq!(
            f.transport().channel().writes,
            vec![
                vec![0x80, 0x18, 0x00],
                vec![0x86, 0x02, 0x00, 0x97, 0x8D, 0x87],
                vec![0x80, 0x18, 0x00],
            ]
        );
    }
}
