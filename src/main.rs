//! trionprog - FPGA configuration flash programmer
//!
//! Programs the SPI NOR flash an FPGA boots from, by bit-banging SPI through
//! the MPSSE engine of an FT2232H. Bitstreams are ASCII hex images.
//!
//! # Session
//!
//! Every command runs inside one adapter session:
//!
//! 1. open the programmer and release all pins
//! 2. set the SPI clock
//! 3. wake the flash from deep power-down and soft-reset it
//! 4. run the command
//! 5. release all pins again, whatever the outcome, so the FPGA can boot

mod cli;
mod commands;
mod programmers;
mod settings;

use clap::Parser;
use cli::{Cli, Commands};
use settings::Settings;
use trionprog_core::flash::ConfigFlash;
use trionprog_core::mpsse::SpiClock;
use trionprog_core::program::ProgramMode;
use trionprog_core::ByteChannel;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.command.needs_programmer() {
        commands::list_programmers();
        return Ok(());
    }

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let programmer = cli
        .programmer
        .clone()
        .or_else(|| settings.programmer.clone())
        .unwrap_or_else(|| programmers::DEFAULT_PROGRAMMER.to_string());

    let clock = match cli.frequency.or(settings.spi.mhz) {
        Some(mhz) => SpiClock::from_mhz(mhz),
        None => SpiClock::DEFAULT,
    };

    programmers::with_channel(&programmer, &settings, |channel| {
        let mut flash = ConfigFlash::with_policy(channel, settings.poll);
        let result = run_session(&mut flash, &cli, clock);

        // Leave with all signals inactive
        if let Err(e) = flash.idle() {
            log::warn!("Failed to release pins: {}", e);
        }
        result
    })
}

fn run_session<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
    cli: &Cli,
    clock: SpiClock,
) -> Result<(), Box<dyn std::error::Error>> {
    flash.init(clock)?;
    // The FPGA may have put the flash to sleep after configuring
    flash.wake_up()?;
    flash.reset()?;

    if cli.reconfigure && !matches!(cli.command, Commands::Reconfigure) {
        commands::run_reconfigure(flash)?;
    }

    match &cli.command {
        Commands::Info => commands::run_info(flash, clock),
        Commands::Reconfigure => commands::run_reconfigure(flash),
        Commands::EraseAll => commands::run_erase_all(flash),
        Commands::Write {
            file,
            address,
            erase,
            verify,
            mode,
        } => {
            let mode = mode.unwrap_or_else(|| {
                let mut mode = ProgramMode::PROGRAM;
                mode.set(ProgramMode::ERASE, *erase);
                mode.set(ProgramMode::VERIFY, *verify);
                mode
            });
            commands::run_write(flash, file, *address, mode)
        }
        Commands::Verify { file, address } => commands::run_verify(flash, file, *address),
        Commands::ListProgrammers => Ok(()),
    }
}
