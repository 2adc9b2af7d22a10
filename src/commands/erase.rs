//! Chip erase and FPGA reconfigure commands

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use trionprog_core::flash::ConfigFlash;
use trionprog_core::ByteChannel;

/// CRESET_N low time before the flash is touched again
pub const RESET_SETTLE_US: u32 = 50_000;

/// Erase the whole flash with a spinner
pub fn run_erase_all<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Erasing whole chip...");
    pb.enable_steady_tick(Duration::from_millis(100));

    match flash.erase_all() {
        Ok(()) => {
            pb.finish_with_message("Erasing... OK!");
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Erasing... FAILED!");
            Err(format!("Chip erase failed: {}", e).into())
        }
    }
}

/// Hold the FPGA in reset and bring the flash back up
///
/// The FPGA starts loading once the session idles the pins on exit.
pub fn run_reconfigure<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Holding FPGA in reset");
    flash.reconfigure_fpga(RESET_SETTLE_US)?;
    Ok(())
}
