//! Settings file
//!
//! Optional defaults for the command line, in TOML:
//!
//! ```toml
//! programmer = "ftdi"
//!
//! [spi]
//! mhz = 30
//!
//! [poll]
//! max_attempts = 400
//! interval_us = 1000
//!
//! [ftdi]
//! interface = "A"
//! latency_ms = 2
//! ```
//!
//! Flags given on the command line win over the file.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use trionprog_core::flash::PollPolicy;

/// Errors reading the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid settings TOML
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Top-level settings
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Programmer name
    pub programmer: Option<String>,
    /// SPI bus settings
    pub spi: SpiSettings,
    /// Busy poll policy
    pub poll: PollPolicy,
    /// FTDI backend settings
    pub ftdi: FtdiSettings,
}

/// `[spi]` table
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpiSettings {
    /// SPI frequency in MHz
    pub mhz: Option<f64>,
}

/// `[ftdi]` table
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FtdiSettings {
    /// Interface letter
    pub interface: Option<char>,
    /// USB latency timer in milliseconds
    pub latency_ms: Option<u8>,
    /// USB product ID, for boards that are not plain FT2232H
    pub pid: Option<u16>,
}

impl Settings {
    /// Load settings from `path`
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        log::debug!("Loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.poll.max_attempts == 0 {
            return Err(SettingsError::Invalid(
                "poll.max_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(mhz) = self.spi.mhz {
            if !mhz.is_finite() || mhz <= 0.0 {
                return Err(SettingsError::Invalid(format!(
                    "spi.mhz must be a positive number, got {}",
                    mhz
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::parse("").unwrap();
        assert!(settings.programmer.is_none());
        assert_eq!(settings.poll, PollPolicy::DEFAULT);
        assert!(settings.spi.mhz.is_none());
    }

    #[test]
    fn test_full_file() {
        let settings = Settings::parse(
            r#"
            programmer = "dummy"

            [spi]
            mhz = 12.5

            [poll]
            max_attempts = 400

            [ftdi]
            interface = "B"
            latency_ms = 4
            pid = 0x6014
            "#,
        )
        .unwrap();
        assert_eq!(settings.programmer.as_deref(), Some("dummy"));
        assert_eq!(settings.spi.mhz, Some(12.5));
        assert_eq!(settings.poll.max_attempts, 400);
        assert_eq!(settings.poll.interval_us, 1000);
        assert_eq!(settings.ftdi.interface, Some('B'));
        assert_eq!(settings.ftdi.latency_ms, Some(4));
        assert_eq!(settings.ftdi.pid, Some(0x6014));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Settings::parse("frequency = 20").is_err());
    }

    #[test]
    fn test_zero_poll_budget_rejected() {
        let settings = Settings::parse("[poll]\nmax_attempts = 0").unwrap();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid(_))
        ));
    }
}
