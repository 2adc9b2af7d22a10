//! Error types for trionprog-core
//!
//! A single `Copy` error type is shared by every layer of the stack, from
//! the byte channel up to the programming engine.

use core::fmt;

/// Core error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// The byte channel accepted fewer bytes than were framed
    ShortWrite {
        /// Bytes handed to the channel
        expected: usize,
        /// Bytes the channel reported as written
        written: usize,
    },
    /// The byte channel returned fewer bytes than the adapter was asked for
    ShortRead {
        /// Bytes requested
        expected: usize,
        /// Bytes actually received
        read: usize,
    },
    /// The byte channel itself reported a failure
    TransferFailed,

    // Flash errors
    /// Status register still reported busy after the poll budget ran out
    Timeout,
    /// Shift or page program length outside the allowed range
    InvalidLength,

    // Image errors
    /// Hex source contains a byte that is neither a hex digit nor a separator
    CorruptImage {
        /// Byte offset of the offending character in the source
        offset: u64,
    },
    /// The hex source could not be read
    IoError,

    // Programming errors
    /// Read-back page differs from the image
    VerifyMismatch {
        /// Flash address of the first byte of the mismatching page
        addr: u32,
    },
    /// A pass ended with fewer bytes processed than the image holds
    Incomplete {
        /// Bytes processed before the pass stopped
        processed: usize,
        /// Decoded image size
        expected: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortWrite { expected, written } => {
                write!(f, "short write to adapter: {} of {} bytes", written, expected)
            }
            Self::ShortRead { expected, read } => {
                write!(f, "short read from adapter: {} of {} bytes", read, expected)
            }
            Self::TransferFailed => write!(f, "adapter transfer failed"),
            Self::Timeout => write!(f, "flash stayed busy past the poll budget"),
            Self::InvalidLength => write!(f, "invalid transfer length"),
            Self::CorruptImage { offset } => {
                write!(f, "hex image corrupt at offset {}", offset)
            }
            Self::IoError => write!(f, "I/O error reading image"),
            Self::VerifyMismatch { addr } => {
                write!(f, "verify failed: page at 0x{:06X} differs", addr)
            }
            Self::Incomplete {
                processed,
                expected,
            } => write!(
                f,
                "pass incomplete: {} of {} bytes processed",
                processed, expected
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
