//! W25Q flash driver and device abstraction.
//!
//! [`Flash`] issues the SPI command sequences against the part;
//! [`FlashDevice`] is the narrow interface the protocol engine drives, so
//! frame handling never sees the bus.

mod chips;
mod device;
mod driver;

pub use chips::{FlashChip, BLOCK_SIZE, PAGE_SIZE, SECTOR_SIZE};
pub use device::FlashDevice;
pub use driver::{Flash, Status, BUSY_TIMEOUT_MS, CHIP_ERASE_TIMEOUT_MS, CMD_TIMEOUT_MS};
