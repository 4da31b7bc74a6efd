//! Host-facing bootloader protocol.
//!
//! Frames arrive as `0xAA 0x55`, a command byte, then command-specific
//! fields; the target answers every command with a single ACK or NACK
//! byte, plus payload and trailing CRC where the command calls for it.

mod engine;
pub mod wire;

pub use engine::Bootloader;
pub use wire::Command;
