//! Command-layer driver for Winbond W25Q serial NOR flash.
//!
//! Every operation is framed by exactly one chip-select assertion cycle;
//! the acquisition is scoped so the line is released on every exit,
//! including mid-transaction bus failures. Program and erase commands arm
//! the write-enable latch immediately before the opcode and then poll the
//! status register until BUSY clears.

use bitflags::bitflags;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use log::{debug, warn};

use super::chips::{FlashChip, PAGE_SIZE};
use super::device::FlashDevice;
use crate::error::{Error, Result};
use crate::spi::{encode_addr, opcodes};

/// Deadline the transport is expected to enforce on one bus transfer.
pub const CMD_TIMEOUT_MS: u32 = 1_000;
/// Busy-poll budget for page program and sector/block erase.
pub const BUSY_TIMEOUT_MS: u32 = 5_000;
/// Busy-poll budget for chip erase; a full 16 MiB part can run past 100 s.
pub const CHIP_ERASE_TIMEOUT_MS: u32 = 200_000;

/// Poll cadence after a page program (typically done in under 3 ms).
const PROGRAM_POLL_US: u32 = 10;
/// Poll cadence after a sector or block erase.
const ERASE_POLL_US: u32 = 1_000;
/// Poll cadence during a chip erase.
const CHIP_ERASE_POLL_US: u32 = 10_000;

/// Settle time between parking CS high and the first command.
const INIT_DELAY_MS: u32 = 100;
/// Wake-up latency after Release from Deep Power-Down.
const WAKE_DELAY_MS: u32 = 1;

bitflags! {
    /// Status register 1 bits used by this driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Erase or program in progress.
        const BUSY = opcodes::SR1_BUSY;
        /// Write-enable latch armed.
        const WEL = opcodes::SR1_WEL;
    }
}

/// W25Q driver over a raw SPI bus, a chip-select pin, and a delay source.
pub struct Flash<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
    chip: FlashChip,
}

impl<SPI, CS, D> Flash<SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    /// Bind the transports to a chip variant. No bus traffic happens here;
    /// call [`Flash::init`] before issuing commands.
    pub fn new(spi: SPI, cs: CS, delay: D, chip: FlashChip) -> Self {
        Self {
            spi,
            cs,
            delay,
            chip,
        }
    }

    /// Park CS high, give the part time to settle, then wake it in case it
    /// was left in deep power-down.
    pub fn init(&mut self) -> Result<()> {
        self.cs.set_high().map_err(|_| Error::Transport)?;
        self.delay.delay_ms(INIT_DELAY_MS);
        self.wake_up()?;
        debug!("{} ready", self.chip.name);
        Ok(())
    }

    /// The chip variant this driver was built for.
    pub fn chip(&self) -> &FlashChip {
        &self.chip
    }

    /// Tear the driver down and hand the transports back.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }

    // =========================================================================
    // Chip-select framing
    // =========================================================================

    /// Run one transaction with CS asserted. The release runs on every
    /// exit, so a failed transfer can never leave the device selected.
    fn select<T>(&mut self, f: impl FnOnce(&mut SPI) -> Result<T>) -> Result<T> {
        self.cs.set_low().map_err(|_| Error::Transport)?;
        let mut result = f(&mut self.spi);
        if result.is_ok() && self.spi.flush().is_err() {
            result = Err(Error::Transport);
        }
        let released = self.cs.set_high();
        let value = result?;
        released.map_err(|_| Error::Transport)?;
        Ok(value)
    }

    /// Opcode (plus address bytes) only.
    fn command(&mut self, cmd: &[u8]) -> Result<()> {
        self.select(|spi| spi.write(cmd).map_err(|_| Error::Transport))
    }

    /// Opcode (plus address bytes), then clock the response in.
    fn command_read(&mut self, cmd: &[u8], buf: &mut [u8]) -> Result<()> {
        self.select(|spi| {
            spi.write(cmd).map_err(|_| Error::Transport)?;
            spi.read(buf).map_err(|_| Error::Transport)
        })
    }

    /// Opcode (plus address bytes), then the payload, in one CS window.
    fn command_write(&mut self, cmd: &[u8], data: &[u8]) -> Result<()> {
        self.select(|spi| {
            spi.write(cmd).map_err(|_| Error::Transport)?;
            spi.write(data).map_err(|_| Error::Transport)
        })
    }

    // =========================================================================
    // Identification and status
    // =========================================================================

    /// Read the manufacturer and device ID bytes (0x90 + three zero bytes).
    pub fn read_id(&mut self) -> Result<(u8, u8)> {
        let mut id = [0u8; 2];
        self.command_read(&[opcodes::REMS, 0, 0, 0], &mut id)?;
        Ok((id[0], id[1]))
    }

    /// Read the three JEDEC ID bytes: manufacturer, memory type, capacity.
    pub fn read_jedec_id(&mut self) -> Result<[u8; 3]> {
        let mut id = [0u8; 3];
        self.command_read(&[opcodes::RDID], &mut id)?;
        Ok(id)
    }

    /// Read status register 1.
    pub fn read_status(&mut self) -> Result<Status> {
        let mut status = [0u8; 1];
        self.command_read(&[opcodes::RDSR], &mut status)?;
        Ok(Status::from_bits_truncate(status[0]))
    }

    /// Arm the write-enable latch. The device clears it again on
    /// completion of every program or erase.
    pub fn write_enable(&mut self) -> Result<()> {
        self.command(&[opcodes::WREN])
    }

    /// Clear the write-enable latch.
    pub fn write_disable(&mut self) -> Result<()> {
        self.command(&[opcodes::WRDI])
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Read `buf.len()` bytes starting at `addr`. No write-enable and no
    /// busy-wait; reading an idle device is unconditional.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        if !self.chip.is_valid_range(addr, buf.len()) {
            return Err(Error::InvalidArgument);
        }
        let [a, b, c] = encode_addr(addr);
        self.command_read(&[opcodes::READ, a, b, c], buf)
    }

    /// Program at most one page. `data` must not extend past the 256-byte
    /// boundary following `addr`; splitting is the caller's contract (see
    /// [`Flash::write`]) and the device's internal address wrap is never
    /// relied on.
    pub fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE || !self.chip.is_valid_range(addr, data.len()) {
            return Err(Error::InvalidArgument);
        }
        self.write_enable()?;
        let [a, b, c] = encode_addr(addr);
        self.command_write(&[opcodes::PP, a, b, c], data)?;
        self.wait_for_write_end(PROGRAM_POLL_US, BUSY_TIMEOUT_MS)
    }

    /// Program an arbitrary span, split into page programs so that no
    /// single command crosses a page boundary: the first chunk runs from
    /// `addr` to the next boundary, then whole pages until the tail.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if !self.chip.is_valid_range(addr, data.len()) {
            return Err(Error::InvalidArgument);
        }
        let mut current = addr;
        let mut remaining = data;
        while !remaining.is_empty() {
            let page_offset = current as usize % PAGE_SIZE;
            let chunk = remaining.len().min(PAGE_SIZE - page_offset);
            let (head, tail) = remaining.split_at(chunk);
            self.program_page(current, head)?;
            current += chunk as u32;
            remaining = tail;
        }
        Ok(())
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Erase the 4 KiB sector containing `addr`.
    pub fn erase_sector(&mut self, addr: u32) -> Result<()> {
        if !self.chip.is_valid_range(addr, 1) {
            return Err(Error::InvalidArgument);
        }
        self.write_enable()?;
        let [a, b, c] = encode_addr(addr);
        self.command(&[opcodes::SE, a, b, c])?;
        self.wait_for_write_end(ERASE_POLL_US, BUSY_TIMEOUT_MS)
    }

    /// Erase the 64 KiB block containing `addr`.
    pub fn erase_block_64k(&mut self, addr: u32) -> Result<()> {
        if !self.chip.is_valid_range(addr, 1) {
            return Err(Error::InvalidArgument);
        }
        self.write_enable()?;
        let [a, b, c] = encode_addr(addr);
        self.command(&[opcodes::BE_64K, a, b, c])?;
        self.wait_for_write_end(ERASE_POLL_US, BUSY_TIMEOUT_MS)
    }

    /// Erase the whole device. Worst case is minutes, not seconds, so this
    /// gets its own poll budget.
    pub fn erase_chip(&mut self) -> Result<()> {
        self.write_enable()?;
        self.command(&[opcodes::CE])?;
        self.wait_for_write_end(CHIP_ERASE_POLL_US, CHIP_ERASE_TIMEOUT_MS)
    }

    // =========================================================================
    // Power management
    // =========================================================================

    /// Enter deep power-down.
    pub fn power_down(&mut self) -> Result<()> {
        self.command(&[opcodes::DP])
    }

    /// Release from deep power-down. The datasheet requires a short pause
    /// before the next command; it is taken here.
    pub fn wake_up(&mut self) -> Result<()> {
        self.command(&[opcodes::RDP])?;
        self.delay.delay_ms(WAKE_DELAY_MS);
        Ok(())
    }

    // =========================================================================
    // Busy polling
    // =========================================================================

    /// Poll status register 1 until BUSY clears. The register is read at
    /// least once before the budget is checked; the common case completes
    /// on the first read. The budget is accumulated poll delay:
    /// `timeout_ms` total with `poll_us` between reads.
    fn wait_for_write_end(&mut self, poll_us: u32, timeout_ms: u32) -> Result<()> {
        let budget_us = timeout_ms.saturating_mul(1_000);
        let mut waited_us = 0u32;
        loop {
            if !self.read_status()?.contains(Status::BUSY) {
                return Ok(());
            }
            if waited_us >= budget_us {
                warn!("busy-poll expired after {} ms", timeout_ms);
                return Err(Error::Timeout);
            }
            self.delay.delay_us(poll_us);
            waited_us = waited_us.saturating_add(poll_us);
        }
    }
}

impl<SPI, CS, D> FlashDevice for Flash<SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    fn chip(&self) -> &FlashChip {
        Flash::chip(self)
    }

    fn read_id(&mut self) -> Result<(u8, u8)> {
        Flash::read_id(self)
    }

    fn read_jedec_id(&mut self) -> Result<[u8; 3]> {
        Flash::read_jedec_id(self)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        Flash::read(self, addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        Flash::write(self, addr, data)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<()> {
        Flash::erase_sector(self, addr)
    }

    fn erase_chip(&mut self) -> Result<()> {
        Flash::erase_chip(self)
    }
}

// =============================================================================
// Tests
// =============================================================================
