//! Error types for the bootloader core.
//!
//! One flat, `no_std` compatible error type is shared by the flash driver
//! and the protocol engine; the engine folds every variant into a single
//! NACK byte on the wire.

use core::fmt;

/// Core error type - `Copy` for cheap propagation through deep call paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An SPI, chip-select, or UART primitive reported failure.
    Transport,
    /// A status busy-poll or a serial receive exceeded its deadline.
    Timeout,
    /// A request parameter was rejected: zero or oversize payload length,
    /// a page-program overrun, or an address range beyond the device.
    InvalidArgument,
    /// A payload checksum did not match the one carried on the wire.
    Crc,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport failure"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Crc => write!(f, "checksum mismatch"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
