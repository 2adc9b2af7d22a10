//! Info command implementation

use trionprog_core::flash::{ChipInfo, ConfigFlash};
use trionprog_core::mpsse::SpiClock;
use trionprog_core::ByteChannel;

/// Print the SPI frequency and the flash identification
pub fn run_info<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
    clock: SpiClock,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("SPI frequency {:.2} MHz (divisor {})", clock.mhz(), clock.divisor());

    let id = flash.read_device_id()?;
    println!(
        "Config manufacturer / device ID {:04X} ({})",
        id,
        ChipInfo::name_for(id)
    );

    let uid = flash.read_unique_id()?;
    println!("Config unique ID {}", format_hex(&uid));

    let status = flash.read_status()?;
    log::debug!("Status register 1: 0x{:02X}", status);

    Ok(())
}

fn format_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
