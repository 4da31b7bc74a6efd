//! W25Q SPI flash opcodes.
//!
//! The subset of the JEDEC SPI-25 command set this driver issues, as
//! listed in the Winbond W25Q64/W25Q128 datasheets.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - arms the WEL latch, required before every program/erase
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL latch
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;

// ============================================================================
// Identification
// ============================================================================

/// Read Manufacturer / Device ID (legacy 0x90 form, three address bytes)
pub const REMS: u8 = 0x90;
/// Read JEDEC ID (manufacturer, memory type, capacity)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Data
// ============================================================================

/// Read Data, 3-byte address
pub const READ: u8 = 0x03;
/// Page Program, 3-byte address
pub const PP: u8 = 0x02;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase, 4 KiB
pub const SE: u8 = 0x20;
/// Block Erase, 64 KiB
pub const BE_64K: u8 = 0xD8;
/// Chip Erase
pub const CE: u8 = 0xC7;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power-Down
pub const DP: u8 = 0xB9;
/// Release from Deep Power-Down
pub const RDP: u8 = 0xAB;

// ============================================================================
// Status register 1 bit definitions
// ============================================================================

/// Status Register 1: erase or program in progress
pub const SR1_BUSY: u8 = 0x01;
/// Status Register 1: write-enable latch armed
pub const SR1_WEL: u8 = 0x02;
