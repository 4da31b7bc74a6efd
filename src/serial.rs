//! Serial link abstraction between the bootloader and the host.

use crate::error::Result;

/// Blocking byte-stream link to the host PC.
///
/// Models the guarantees of a UART HAL: `send` blocks until every byte has
/// been accepted by the hardware, `recv` blocks until `buf` is full or the
/// deadline expires. Implementations map hardware faults to
/// [`Error::Transport`] and an expired deadline to [`Error::Timeout`].
///
/// [`Error::Transport`]: crate::Error::Transport
/// [`Error::Timeout`]: crate::Error::Timeout
pub trait SerialPort {
    /// Transmit all of `data`.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Fill `buf`, giving up after `timeout_ms` milliseconds.
    fn recv(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<()>;

    /// Fill `buf` with no deadline. Used only while waiting for the frame
    /// start markers between commands.
    fn recv_blocking(&mut self, buf: &mut [u8]) -> Result<()>;
}
