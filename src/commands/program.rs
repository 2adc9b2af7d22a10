//! Write and verify command implementation

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use trionprog_core::flash::ConfigFlash;
use trionprog_core::hex::HexFile;
use trionprog_core::program::{
    program_hex, Pass, PassReport, ProgramMode, ProgramProgress, ProgramReport,
};
use trionprog_core::ByteChannel;

/// Progress reporter using indicatif progress bars
struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
    total: u64,
}

impl IndicatifProgress {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
            total: 0,
        }
    }

    fn create_bar(&mut self, total: u64, pass: Pass) {
        self.total = total;
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                    pass.verb()
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    fn create_spinner(&mut self, message: String) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }
}

impl ProgramProgress for IndicatifProgress {
    fn pass_started(&mut self, pass: Pass, total_bytes: usize) {
        match pass {
            Pass::Erase => self.create_spinner(format!(
                "Erasing sectors under {} bytes...",
                total_bytes
            )),
            Pass::Program | Pass::Verify => self.create_bar(total_bytes as u64, pass),
        }
    }

    fn percent(&mut self, _pass: Pass, percent: u8) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(self.total * percent as u64 / 100);
        }
    }

    fn pass_finished(&mut self, report: &PassReport) {
        if let Some(pb) = self.current_bar.take() {
            let message = format!(
                "{}... {}",
                report.pass.verb(),
                if report.is_ok() { "OK!" } else { "FAILED!" }
            );
            if report.is_ok() {
                pb.finish_with_message(message);
            } else {
                pb.abandon_with_message(message);
            }
        }
    }
}

/// Write a hex image, with the passes selected by `mode`
pub fn run_write<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
    input: &Path,
    address: u32,
    mode: ProgramMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = run_passes(flash, input, address, mode | ProgramMode::PROGRAM)?;
    println!(
        "Wrote {} bytes from {} at 0x{:06X}",
        report.image_size,
        input.display(),
        address
    );
    Ok(())
}

/// Compare flash contents with a hex image
pub fn run_verify<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
    input: &Path,
    address: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = run_passes(flash, input, address, ProgramMode::VERIFY)?;
    println!(
        "Flash at 0x{:06X} matches {} ({} bytes)",
        address,
        input.display(),
        report.image_size
    );
    Ok(())
}

fn run_passes<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
    input: &Path,
    address: u32,
    mode: ProgramMode,
) -> Result<ProgramReport, Box<dyn std::error::Error>> {
    let source = HexFile::new(input);
    let mut progress = IndicatifProgress::new();

    let report = program_hex(flash, &source, address, mode, &mut progress)
        .map_err(|e| format!("Hex file {} unusable: {}", input.display(), e))?;

    for pass in &report.passes {
        log::debug!(
            "{} pass: {}/{} bytes{}",
            pass.pass,
            pass.processed,
            pass.expected,
            pass.error.map(|e| format!(", {}", e)).unwrap_or_default()
        );
    }

    if let Some(failed) = report.passes.iter().find(|p| !p.is_ok()) {
        let cause = report
            .result()
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        return Err(format!(
            "{} failed after {} of {} bytes: {}",
            failed.pass.verb(),
            failed.processed,
            failed.expected,
            cause
        )
        .into());
    }
    Ok(report)
}
