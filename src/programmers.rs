//! Programmer registration and dispatch
//!
//! Backends are feature-gated. Each one produces a
//! [`ByteChannel`]; everything above the channel is shared.

use trionprog_core::ByteChannel;

use crate::settings::Settings;

/// Programmer used when neither the command line nor the settings file
/// names one
pub const DEFAULT_PROGRAMMER: &str = "ftdi";

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all programmers enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "ftdi")]
    programmers.push(ProgrammerInfo {
        name: "ftdi",
        aliases: &["ft2232h"],
        description: "FT2232H channel A wired to the FPGA configuration pins",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["sim"],
        description: "Simulated adapter with an in-memory GD25Q80E",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)"
            .to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:8} - {}\n", p.name, p.description));
    }
    help
}

/// Resolve a name or alias to the programmer's primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    let name = name.to_ascii_lowercase();
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name.as_str()))
        .map(|p| p.name)
}

/// Open `programmer` and run `f` with its byte channel
///
/// The channel is closed (and, for real hardware, the pins released) when
/// `f` returns.
#[allow(unused_variables)]
pub fn with_channel<F>(
    programmer: &str,
    settings: &Settings,
    f: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn ByteChannel) -> Result<(), Box<dyn std::error::Error>>,
{
    let canonical_name = find_programmer(programmer).ok_or_else(|| {
        format!(
            "Unknown programmer '{}'.\n{}",
            programmer,
            programmer_help().trim_end()
        )
    })?;

    match canonical_name {
        #[cfg(feature = "ftdi")]
        "ftdi" => {
            let config = ftdi_config(settings)?;
            let mut channel = trionprog_ftdi::FtdiChannel::open(&config).map_err(|e| {
                format!(
                    "{}\nMake sure the adapter is connected and you have permissions.",
                    e
                )
            })?;
            f(&mut channel)
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            log::info!("Using simulated adapter");
            let mut channel = trionprog_dummy::SimAdapter::new_default();
            f(&mut channel)
        }

        _ => Err(format!("Programmer '{}' is not supported in this build", canonical_name).into()),
    }
}

#[cfg(feature = "ftdi")]
fn ftdi_config(
    settings: &Settings,
) -> Result<trionprog_ftdi::FtdiConfig, Box<dyn std::error::Error>> {
    use trionprog_ftdi::{FtdiConfig, FtdiInterface, FTDI_VID};

    let mut config = FtdiConfig::default();
    if let Some(letter) = settings.ftdi.interface {
        let interface = FtdiInterface::from_char(letter)
            .ok_or_else(|| format!("Invalid FTDI interface '{}': must be A, B, C or D", letter))?;
        config = config.interface(interface);
    }
    if let Some(latency) = settings.ftdi.latency_ms {
        config = config.latency(latency)?;
    }
    if let Some(pid) = settings.ftdi.pid {
        config = config.usb_id(FTDI_VID, pid);
    }
    Ok(config)
}
