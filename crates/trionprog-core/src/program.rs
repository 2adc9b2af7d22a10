//! Hex image programming engine
//!
//! Runs up to three passes over a hex image, always in this order:
//!
//! 1. **Erase** the sectors the image will occupy
//! 2. **Program** it page by page
//! 3. **Verify** it page by page against a read-back
//!
//! The image is validated before the first device command, so a corrupt
//! file never touches the flash. Each paged pass reopens the image and
//! decodes it afresh. Pages never cross a 256-byte boundary, which keeps an
//! unaligned start address from wrapping inside a page.

use bitflags::bitflags;

use crate::channel::ByteChannel;
use crate::erase::erase_area;
use crate::error::{Error, Result};
use crate::flash::opcodes::PAGE_SIZE;
use crate::flash::ConfigFlash;
use crate::hex::{decode_size, HexDecoder, HexSource};

bitflags! {
    /// Passes to run
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProgramMode: u8 {
        /// Erase the affected sectors first
        const ERASE   = 1 << 0;
        /// Program the image
        const PROGRAM = 1 << 1;
        /// Read back and compare
        const VERIFY  = 1 << 2;
    }
}

impl Default for ProgramMode {
    fn default() -> Self {
        ProgramMode::all()
    }
}

/// One of the engine's passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Erase pass
    Erase,
    /// Program pass
    Program,
    /// Verify pass
    Verify,
}

impl Pass {
    /// Progressive verb for status lines
    pub fn verb(&self) -> &'static str {
        match self {
            Pass::Erase => "Erasing",
            Pass::Program => "Programming",
            Pass::Verify => "Verifying",
        }
    }
}

impl core::fmt::Display for Pass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Pass::Erase => "erase",
            Pass::Program => "program",
            Pass::Verify => "verify",
        })
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Which pass
    pub pass: Pass,
    /// Image bytes covered before the pass stopped
    pub processed: usize,
    /// Decoded image size
    pub expected: usize,
    /// What stopped the pass early, if anything
    pub error: Option<Error>,
}

impl PassReport {
    fn new(pass: Pass, expected: usize) -> Self {
        PassReport {
            pass,
            processed: 0,
            expected,
            error: None,
        }
    }

    /// Everything processed and nothing failed
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.processed == self.expected
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramReport {
    /// Decoded image size
    pub image_size: usize,
    /// Passes that ran, in order
    pub passes: Vec<PassReport>,
}

impl ProgramReport {
    /// Every pass that ran succeeded
    pub fn is_ok(&self) -> bool {
        self.passes.iter().all(PassReport::is_ok)
    }

    /// Report for `pass`, if it ran
    pub fn pass(&self, pass: Pass) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.pass == pass)
    }

    /// First failure as an error
    pub fn result(&self) -> Result<()> {
        match self.passes.iter().find(|p| !p.is_ok()) {
            Some(p) => Err(p.error.unwrap_or(Error::Incomplete {
                processed: p.processed,
                expected: p.expected,
            })),
            None => Ok(()),
        }
    }
}

/// Progress callback for [`program_hex`]
pub trait ProgramProgress {
    /// A pass is starting over `total_bytes` image bytes
    fn pass_started(&mut self, _pass: Pass, _total_bytes: usize) {}

    /// `percent` of the image has been processed; called once per distinct
    /// value
    fn percent(&mut self, _pass: Pass, _percent: u8) {}

    /// A pass has ended
    fn pass_finished(&mut self, _report: &PassReport) {}
}

/// Progress sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgramProgress for NoProgress {}

/// Erase, program and/or verify a hex image at `write_addr`
///
/// Returns `Err` only when nothing was done: the image is corrupt or could
/// not be read. Device failures end up in the [`ProgramReport`]. An erase
/// failure skips the remaining passes; a program failure still lets a
/// requested verify run so the damage can be seen.
pub fn program_hex<C, S, P>(
    flash: &mut ConfigFlash<C>,
    source: &S,
    write_addr: u32,
    mode: ProgramMode,
    progress: &mut P,
) -> Result<ProgramReport>
where
    C: ByteChannel,
    S: HexSource + ?Sized,
    P: ProgramProgress + ?Sized,
{
    let image_size = decode_size(source.open()?)?;
    let erase_len = u32::try_from(image_size).map_err(|_| Error::InvalidLength)?;
    log::info!(
        "Image holds {} bytes, target 0x{:06X}, mode {:?}",
        image_size,
        write_addr,
        mode
    );

    let mut report = ProgramReport {
        image_size,
        passes: Vec::new(),
    };

    if mode.contains(ProgramMode::ERASE) {
        progress.pass_started(Pass::Erase, image_size);
        let mut pass = PassReport::new(Pass::Erase, image_size);
        match erase_area(flash, write_addr, erase_len) {
            Ok(commands) => {
                log::debug!("Erase issued {} commands", commands);
                pass.processed = image_size;
            }
            Err(e) => pass.error = Some(e),
        }
        progress.pass_finished(&pass);
        let failed = !pass.is_ok();
        report.passes.push(pass);
        if failed {
            return Ok(report);
        }
    }

    if mode.contains(ProgramMode::PROGRAM) {
        let pass = paged_pass(
            flash,
            source,
            write_addr,
            image_size,
            Pass::Program,
            progress,
            |flash, addr, page| flash.write_page(addr, page),
        );
        report.passes.push(pass);
    }

    if mode.contains(ProgramMode::VERIFY) {
        let mut readback = [0u8; PAGE_SIZE];
        let pass = paged_pass(
            flash,
            source,
            write_addr,
            image_size,
            Pass::Verify,
            progress,
            |flash, addr, page| {
                let readback = &mut readback[..page.len()];
                flash.read_bytes(addr, readback)?;
                if readback != page {
                    return Err(Error::VerifyMismatch { addr });
                }
                Ok(())
            },
        );
        report.passes.push(pass);
    }

    Ok(report)
}

/// Walk the image page by page, calling `page_op` for each
fn paged_pass<C, S, P, F>(
    flash: &mut ConfigFlash<C>,
    source: &S,
    write_addr: u32,
    image_size: usize,
    pass: Pass,
    progress: &mut P,
    mut page_op: F,
) -> PassReport
where
    C: ByteChannel,
    S: HexSource + ?Sized,
    P: ProgramProgress + ?Sized,
    F: FnMut(&mut ConfigFlash<C>, u32, &[u8]) -> Result<()>,
{
    progress.pass_started(pass, image_size);
    let mut report = PassReport::new(pass, image_size);

    if let Err(e) = walk_pages(
        flash,
        source,
        write_addr,
        pass,
        progress,
        &mut report,
        &mut page_op,
    ) {
        report.error = Some(e);
    }
    if report.error.is_none() && report.processed != image_size {
        report.error = Some(Error::Incomplete {
            processed: report.processed,
            expected: image_size,
        });
    }

    if let Some(e) = report.error {
        log::debug!(
            "{} pass stopped after {} of {} bytes: {}",
            pass,
            report.processed,
            image_size,
            e
        );
    }
    progress.pass_finished(&report);
    report
}

fn walk_pages<C, S, P, F>(
    flash: &mut ConfigFlash<C>,
    source: &S,
    write_addr: u32,
    pass: Pass,
    progress: &mut P,
    report: &mut PassReport,
    page_op: &mut F,
) -> Result<()>
where
    C: ByteChannel,
    S: HexSource + ?Sized,
    P: ProgramProgress + ?Sized,
    F: FnMut(&mut ConfigFlash<C>, u32, &[u8]) -> Result<()>,
{
    let mut decoder = HexDecoder::new(source.open()?);
    let mut page = [0u8; PAGE_SIZE];
    let mut addr = write_addr;
    let mut last_percent = None;

    while report.processed < report.expected {
        let room = PAGE_SIZE - (addr as usize % PAGE_SIZE);
        let want = room.min(report.expected - report.processed);
        let len = decoder.fill(&mut page[..want])?;
        if len == 0 {
            // Image shrank since it was sized
            break;
        }

        page_op(flash, addr, &page[..len])?;

        addr = addr.wrapping_add(len as u32);
        report.processed += len;

        let percent = (report.processed * 100 / report.expected) as u8;
        if last_percent != Some(percent) {
            last_percent = Some(percent);
            progress.percent(pass, percent);
        }
    }
    Ok(())
}
