//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trionprog_core::program::ProgramMode;

/// Parse a flash address: decimal, or hex with a `$` or `0x` prefix
pub fn parse_address(s: &str) -> Result<u32, String> {
    let hex = s
        .strip_prefix('$')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"));
    if let Some(hex) = hex {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse pass letters: `e` adds erase, `v` adds verify, `p` is implied
pub fn parse_mode(s: &str) -> Result<ProgramMode, String> {
    let mut mode = ProgramMode::PROGRAM;
    for c in s.chars() {
        match c.to_ascii_lowercase() {
            'e' => mode |= ProgramMode::ERASE,
            'v' => mode |= ProgramMode::VERIFY,
            'p' => {}
            other => return Err(format!("Unknown pass letter '{}' (use e, p, v)", other)),
        }
    }
    Ok(mode)
}

#[derive(Parser)]
#[command(name = "trionprog")]
#[command(author, version, about = "FPGA configuration flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Programmer to use (ftdi, dummy)
    #[arg(short, long, global = true)]
    pub programmer: Option<String>,

    /// SPI frequency in MHz (6-60, default 20)
    #[arg(short, long, global = true)]
    pub frequency: Option<f64>,

    /// Hold the FPGA in reset during the command; it reloads its
    /// configuration when the adapter lets go
    #[arg(short = 'c', long, global = true)]
    pub reconfigure: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show SPI frequency and flash identification
    Info,

    /// Reset the FPGA so it reloads its configuration
    Reconfigure,

    /// Erase the whole flash
    EraseAll,

    /// Write a hex image to flash
    Write {
        /// Hex image
        file: PathBuf,

        /// Start address (decimal, $hex or 0xhex)
        #[arg(value_parser = parse_address, default_value = "0")]
        address: u32,

        /// Erase the affected sectors first
        #[arg(short, long)]
        erase: bool,

        /// Verify after writing
        #[arg(long)]
        verify: bool,

        /// Pass letters, e.g. "ev" for erase + program + verify
        #[arg(short, long, value_parser = parse_mode, conflicts_with_all = ["erase", "verify"])]
        mode: Option<ProgramMode>,
    },

    /// Verify flash contents against a hex image
    Verify {
        /// Hex image
        file: PathBuf,

        /// Start address (decimal, $hex or 0xhex)
        #[arg(value_parser = parse_address, default_value = "0")]
        address: u32,
    },

    /// List supported programmers
    ListProgrammers,
}

impl Commands {
    /// Whether the command talks to the adapter
    pub fn needs_programmer(&self) -> bool {
        !matches!(self, Commands::ListProgrammers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("4096"), Ok(4096));
        assert_eq!(parse_address("$1000"), Ok(0x1000));
        assert_eq!(parse_address("0x1F80"), Ok(0x1F80));
        assert_eq!(parse_address("0XAB"), Ok(0xAB));
        assert!(parse_address("$").is_err());
        assert!(parse_address("1k").is_err());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(""), Ok(ProgramMode::PROGRAM));
        assert_eq!(parse_mode("ev"), Ok(ProgramMode::all()));
        assert_eq!(
            parse_mode("V"),
            Ok(ProgramMode::PROGRAM | ProgramMode::VERIFY)
        );
        assert!(parse_mode("x").is_err());
    }

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_write_arguments() {
        let cli = Cli::try_parse_from([
            "trionprog", "-p", "dummy", "-f", "30", "write", "top.hex", "$2000", "--mode", "ev",
        ])
        .unwrap();
        assert_eq!(cli.programmer.as_deref(), Some("dummy"));
        assert_eq!(cli.frequency, Some(30.0));
        match cli.command {
            Commands::Write {
                file,
                address,
                mode,
                ..
            } => {
                assert_eq!(file, PathBuf::from("top.hex"));
                assert_eq!(address, 0x2000);
                assert_eq!(mode, Some(ProgramMode::all()));
            }
            _ => panic!("expected write"),
        }
    }
}
