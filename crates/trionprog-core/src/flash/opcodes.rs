//! SPI flash opcodes
//!
//! The command set of the GD25Q/W25Q family of configuration memories.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;

// ============================================================================
// Identification
// ============================================================================

/// Read Manufacturer / Device ID
pub const REMS: u8 = 0x90;
/// Read Unique ID
pub const RDUID: u8 = 0x4B;
/// Release from Deep Power Down
pub const RES: u8 = 0xAB;

// ============================================================================
// Read / program
// ============================================================================

/// Read Data
pub const READ: u8 = 0x03;
/// Page Program (up to 256 bytes)
pub const PP: u8 = 0x02;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase (4 KB)
pub const SE_20: u8 = 0x20;
/// Block Erase (32 KB)
pub const BE_52: u8 = 0x52;
/// Block Erase (64 KB)
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_60: u8 = 0x60;

// ============================================================================
// Reset
// ============================================================================

/// Enable Reset
pub const RSTEN: u8 = 0x66;
/// Reset Device
pub const RST: u8 = 0x99;

// ============================================================================
// Status register bits
// ============================================================================

/// Status Register 1: Write In Progress
pub const SR1_WIP: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;

// ============================================================================
// Geometry
// ============================================================================

/// Page program unit; writes wrap inside a page
pub const PAGE_SIZE: usize = 256;
/// Smallest erase unit
pub const SECTOR_SIZE: u32 = 4096;
/// 32 KB erase block
pub const BLOCK32_SIZE: u32 = 32 * 1024;
/// 64 KB erase block
pub const BLOCK64_SIZE: u32 = 64 * 1024;
/// Flash addresses are sent as 24 bits
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;
/// Length of the factory unique ID
pub const UNIQUE_ID_LEN: usize = 16;
