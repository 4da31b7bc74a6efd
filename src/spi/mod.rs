//! SPI wire-level vocabulary for the W25Q command set.

mod address;
pub mod opcodes;

pub use address::encode_addr;
