//! MPSSE command opcodes
//!
//! Only the subset the configuration-flash protocol needs. Values follow
//! the FTDI application note AN_108.

// ============================================================================
// Data shifting
// ============================================================================

/// Clock data bytes out (MSB first)
pub const MPSSE_DO_WRITE: u8 = 0x10;

/// Clock data bytes in (MSB first)
pub const MPSSE_DO_READ: u8 = 0x20;

/// Change data out on the negative clock edge (SPI mode 0)
pub const MPSSE_WRITE_NEG: u8 = 0x01;

// ============================================================================
// GPIO
// ============================================================================

/// Set data bits low byte (ADBUS0-7): followed by levels, then directions
pub const SET_BITS_LOW: u8 = 0x80;

// ============================================================================
// Clocking
// ============================================================================

/// Set clock divisor: followed by divisor low byte, then high byte
pub const TCK_DIVISOR: u8 = 0x86;

/// Disable adaptive clocking
pub const DIS_ADAPTIVE: u8 = 0x97;

/// Disable 3-phase data clocking
pub const DIS_3_PHASE: u8 = 0x8D;

// ============================================================================
// Flow control
// ============================================================================

/// Flush the adapter's reply buffer back to the host
pub const SEND_IMMEDIATE: u8 = 0x87;

/// Largest number of bytes a single shift command can carry
pub const MAX_SHIFT_LEN: usize = 65536;

/// Shift opcode for a transfer, with or without read-back
pub const fn shift_opcode(capture: bool) -> u8 {
    if capture {
        MPSSE_DO_WRITE | MPSSE_WRITE_NEG | MPSSE_DO_READ
    } else {
        MPSSE_DO_WRITE | MPSSE_WRITE_NEG
    }
}
