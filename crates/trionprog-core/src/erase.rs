//! Erase region planning
//!
//! A byte range is first widened to the enclosing 4 KB-aligned range, then
//! covered greedily: a 64 KB block wherever one is aligned and fits, else a
//! 32 KB block, else a 4 KB sector. The sector step is always eligible, so
//! the walk always terminates.

use crate::channel::ByteChannel;
use crate::error::Result;
use crate::flash::opcodes::{BLOCK32_SIZE, BLOCK64_SIZE, BE_52, BE_D8, SECTOR_SIZE, SE_20};
use crate::flash::{BusyOp, ConfigFlash};

/// Erase granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EraseSize {
    /// 4 KB sector
    Sector4K,
    /// 32 KB block
    Block32K,
    /// 64 KB block
    Block64K,
}

impl EraseSize {
    /// Largest first
    pub const ALL: [EraseSize; 3] = [EraseSize::Block64K, EraseSize::Block32K, EraseSize::Sector4K];

    /// Size in bytes
    pub const fn bytes(self) -> u32 {
        match self {
            EraseSize::Sector4K => SECTOR_SIZE,
            EraseSize::Block32K => BLOCK32_SIZE,
            EraseSize::Block64K => BLOCK64_SIZE,
        }
    }

    /// Flash opcode erasing one unit of this size
    pub const fn opcode(self) -> u8 {
        match self {
            EraseSize::Sector4K => SE_20,
            EraseSize::Block32K => BE_52,
            EraseSize::Block64K => BE_D8,
        }
    }

    /// What the flash is busy with after erasing one unit
    pub const fn busy_op(self) -> BusyOp {
        match self {
            EraseSize::Sector4K => BusyOp::SectorErase,
            EraseSize::Block32K => BusyOp::Block32Erase,
            EraseSize::Block64K => BusyOp::Block64Erase,
        }
    }
}

/// One erase command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseOp {
    /// Start address, aligned to `size`
    pub addr: u32,
    /// Erase granularity
    pub size: EraseSize,
}

impl EraseOp {
    /// One past the last erased address
    pub fn end(&self) -> u64 {
        self.addr as u64 + self.size.bytes() as u64
    }
}

/// Widen `[addr, addr + size)` to whole sectors
///
/// Returns the aligned start and length. An empty range stays empty.
pub fn align_to_sectors(addr: u32, size: u32) -> (u32, u64) {
    if size == 0 {
        return (addr & !(SECTOR_SIZE - 1), 0);
    }
    let sector = SECTOR_SIZE as u64;
    let start = addr as u64 & !(sector - 1);
    let end = (addr as u64 + size as u64).div_ceil(sector) * sector;
    (start as u32, end - start)
}

/// Plan the erase commands covering `[addr, addr + size)`
pub fn plan_erase(addr: u32, size: u32) -> Vec<EraseOp> {
    let (start, len) = align_to_sectors(addr, size);
    let mut ops = Vec::new();
    let mut cursor = start as u64;
    let mut remaining = len;

    while remaining > 0 {
        let step = EraseSize::ALL
            .into_iter()
            .find(|s| {
                let bytes = s.bytes() as u64;
                cursor % bytes == 0 && remaining >= bytes
            })
            .unwrap_or(EraseSize::Sector4K);
        ops.push(EraseOp {
            addr: cursor as u32,
            size: step,
        });
        cursor += step.bytes() as u64;
        remaining -= step.bytes() as u64;
    }

    log::debug!(
        "Erase plan for 0x{:06X}+{}: {} commands over 0x{:06X}+{}",
        addr,
        size,
        ops.len(),
        start,
        len
    );
    ops
}

/// Erase everything in `[addr, addr + size)` and whatever else shares its
/// sectors
///
/// Stops at the first failing erase. Returns the number of erase commands
/// issued.
pub fn erase_area<C: ByteChannel>(
    flash: &mut ConfigFlash<C>,
    addr: u32,
    size: u32,
) -> Result<usize> {
    let plan = plan_erase(addr, size);
    for op in &plan {
        log::debug!("Erasing {:?} at 0x{:06X}", op.size, op.addr);
        if let Err(e) = flash.erase(op.size, op.addr) {
            log::debug!("Erase at 0x{:06X} failed: {}", op.addr, e);
            return Err(e);
        }
    }
    Ok(plan.len())
}
