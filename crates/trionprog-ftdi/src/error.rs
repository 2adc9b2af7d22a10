//! Error types for the FTDI backend

use thiserror::Error;

/// Errors that can occur while opening or talking to the adapter
#[derive(Debug, Error)]
pub enum FtdiError {
    /// No device with the requested VID/PID could be opened
    #[error("Failed to open FTDI device {vid:04X}:{pid:04X}: {source}")]
    OpenFailed {
        vid: u16,
        pid: u16,
        #[source]
        source: ftdi::Error,
    },

    /// A setup step after opening failed
    #[error("Failed to {step}: {source}")]
    ConfigFailed {
        step: &'static str,
        #[source]
        source: ftdi::Error,
    },

    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(#[source] std::io::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<FtdiError> for trionprog_core::Error {
    fn from(e: FtdiError) -> Self {
        match e {
            FtdiError::InvalidParameter(_) => trionprog_core::Error::InvalidLength,
            _ => trionprog_core::Error::TransferFailed,
        }
    }
}

/// Result type for FTDI operations
pub type Result<T> = std::result::Result<T, FtdiError>;
