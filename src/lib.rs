//! w25boot - UART bootloader core for Winbond W25Q serial NOR flash
//!
//! This crate is the firmware core of a serial bootloader: a host PC sends
//! framed commands over a UART link, and the target programs, reads, and
//! erases an external W25Q64/W25Q128 SPI NOR flash on its behalf.
//!
//! Two subsystems carry the weight:
//!
//! - [`flash`] - a command-layer driver for the W25Q family. It frames each
//!   operation in one chip-select assertion cycle, arms the write-enable
//!   latch immediately before every program or erase, splits writes so no
//!   page program crosses a 256-byte boundary, and polls the status
//!   register until the part goes idle.
//! - [`protocol`] - the host-facing request/response engine. It hunts for
//!   the `0xAA 0x55` start markers, validates payloads with CRC-16/CCITT,
//!   drives the flash through the narrow [`flash::FlashDevice`] trait, and
//!   answers every command with a single ACK or NACK byte.
//!
//! Transports are borrowed from the environment: SPI and chip-select via
//! the `embedded-hal` blocking traits, the serial link via the
//! [`serial::SerialPort`] trait. There is no heap use anywhere; the 4 KiB
//! payload buffer lives inside the protocol session.
//!
//! # Example
//!
//! ```ignore
//! use w25boot::flash::{Flash, FlashChip};
//! use w25boot::protocol::Bootloader;
//!
//! let mut flash = Flash::new(spi, cs, delay, FlashChip::W25Q128);
//! flash.init()?;
//!
//! let mut boot = Bootloader::new(uart, flash);
//! loop {
//!     // one framed command per iteration; failures were already NACKed
//!     let _ = boot.poll();
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod crc;
pub mod error;
pub mod flash;
pub mod protocol;
pub mod serial;
pub mod spi;

pub use error::{Error, Result};
