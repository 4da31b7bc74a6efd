//! Bootloader protocol engine.
//!
//! The engine runs a perpetual single-command loop: block on the two start
//! markers, complete one command under bounded per-field timeouts, answer
//! with one ACK or NACK, return to waiting. It is stateless between
//! commands apart from the two byte counters and the shared payload
//! buffer, whose contents are valid only until the next command begins.

use log::{debug, warn};

use super::wire::{self, Command};
use crate::crc::crc16;
use crate::error::{Error, Result};
use crate::flash::{FlashDevice, PAGE_SIZE, SECTOR_SIZE};
use crate::serial::SerialPort;

/// Bootloader session: the serial link, the flash device, the shared
/// payload buffer, and the lifetime byte counters.
pub struct Bootloader<S, F> {
    serial: S,
    flash: F,
    /// Scratch for markers, command bytes, and integer fields.
    rx: [u8; wire::BUFFER_SIZE],
    /// Shared between WRITE (inbound), READ (outbound), and VERIFY.
    payload: [u8; wire::MAX_PAYLOAD],
    total_bytes_written: u32,
    total_bytes_read: u32,
}

impl<S: SerialPort, F: FlashDevice> Bootloader<S, F> {
    /// Create a session around an initialised flash device.
    pub fn new(serial: S, flash: F) -> Self {
        Self {
            serial,
            flash,
            rx: [0; wire::BUFFER_SIZE],
            payload: [0; wire::MAX_PAYLOAD],
            total_bytes_written: 0,
            total_bytes_read: 0,
        }
    }

    /// Bytes accepted by WRITE commands so far.
    pub fn total_bytes_written(&self) -> u32 {
        self.total_bytes_written
    }

    /// Bytes served to READ commands so far.
    pub fn total_bytes_read(&self) -> u32 {
        self.total_bytes_read
    }

    /// The flash device behind the session.
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Tear the session down and hand the transports back.
    pub fn into_parts(self) -> (S, F) {
        (self.serial, self.flash)
    }

    /// Handle one framed command: block until the start markers arrive,
    /// then run the command to its ACK or NACK.
    ///
    /// A two-byte prefix that is not `0xAA 0x55` is discarded without any
    /// reply, so a host can resynchronise by simply sending the next
    /// frame. Returns `Err` only when the serial link itself fails;
    /// command-level failures have already been answered with a NACK.
    pub fn poll(&mut self) -> Result<()> {
        self.serial.recv_blocking(&mut self.rx[..2])?;
        if self.rx[..2] != [wire::START_MARKER1, wire::START_MARKER2] {
            return Ok(());
        }
        if self
            .serial
            .recv(&mut self.rx[..1], wire::CMD_TIMEOUT_MS)
            .is_err()
        {
            warn!("command byte timed out");
            return self.reject();
        }
        let byte = self.rx[0];
        match Command::from_byte(byte) {
            Some(Command::Write) => self.handle_write(),
            Some(Command::Read) => self.handle_read(),
            Some(Command::EraseSector) => self.handle_erase_sector(),
            Some(Command::EraseChip) => self.handle_erase_chip(),
            Some(Command::GetInfo) => self.handle_get_info(),
            Some(Command::Verify) => self.handle_verify(),
            None => {
                warn!("unknown command {byte:#04x}");
                self.reject()
            }
        }
    }

    // =========================================================================
    // Field receive helpers
    // =========================================================================

    fn recv_u32(&mut self) -> Result<u32> {
        self.serial.recv(&mut self.rx[..4], wire::CMD_TIMEOUT_MS)?;
        Ok(u32::from_le_bytes([
            self.rx[0], self.rx[1], self.rx[2], self.rx[3],
        ]))
    }

    fn recv_u16(&mut self) -> Result<u16> {
        self.serial.recv(&mut self.rx[..2], wire::CMD_TIMEOUT_MS)?;
        Ok(u16::from_le_bytes([self.rx[0], self.rx[1]]))
    }

    /// Receive and bounds-check the payload length field. An out-of-range
    /// length is rejected before any further byte is consumed; the host
    /// can tell the failure modes apart by where the target stops reading.
    fn recv_length(&mut self) -> Result<usize> {
        let length = self.recv_u32()? as usize;
        if length == 0 || length > wire::MAX_PAYLOAD {
            warn!("payload length {length} out of range");
            return Err(Error::InvalidArgument);
        }
        Ok(length)
    }

    /// Receive `len` payload bytes into the shared buffer, in chunks of at
    /// most one scratch buffer.
    fn recv_payload(&mut self, len: usize) -> Result<()> {
        let mut offset = 0;
        while offset < len {
            let chunk = (len - offset).min(wire::BUFFER_SIZE);
            self.serial
                .recv(&mut self.payload[offset..offset + chunk], wire::CMD_TIMEOUT_MS)?;
            offset += chunk;
        }
        Ok(())
    }

    fn respond(&mut self, byte: u8) -> Result<()> {
        self.serial.send(&[byte])
    }

    /// NACK the current command. The protocol error has been answered, so
    /// this reports `Err` only for a dead link.
    fn reject(&mut self) -> Result<()> {
        self.respond(wire::NACK)
    }

    // =========================================================================
    // Command handlers
    // =========================================================================

    fn handle_write(&mut self) -> Result<()> {
        let length = match self.recv_length() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        let address = match self.recv_u32() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        if self.recv_payload(length).is_err() {
            return self.reject();
        }
        let expected = match self.recv_u16() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        let actual = crc16(&self.payload[..length]);
        if actual != expected {
            warn!("write checksum mismatch: computed {actual:#06x}, frame carried {expected:#06x}");
            return self.reject();
        }
        if self.flash.write(address, &self.payload[..length]).is_err() {
            return self.reject();
        }
        self.total_bytes_written += length as u32;
        debug!("wrote {length} bytes at {address:#010x}");
        self.respond(wire::ACK)
    }

    fn handle_read(&mut self) -> Result<()> {
        let length = match self.recv_length() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        let address = match self.recv_u32() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        if self.flash.read(address, &mut self.payload[..length]).is_err() {
            return self.reject();
        }
        self.respond(wire::ACK)?;
        self.serial.send(&self.payload[..length])?;
        let crc = crc16(&self.payload[..length]);
        self.serial.send(&crc.to_le_bytes())?;
        self.total_bytes_read += length as u32;
        debug!("served {length} bytes from {address:#010x}");
        Ok(())
    }

    fn handle_erase_sector(&mut self) -> Result<()> {
        let address = match self.recv_u32() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        if self.flash.erase_sector(address).is_err() {
            return self.reject();
        }
        debug!("erased sector at {address:#010x}");
        self.respond(wire::ACK)
    }

    fn handle_erase_chip(&mut self) -> Result<()> {
        // may block for tens of seconds; the host knows to wait
        if self.flash.erase_chip().is_err() {
            return self.reject();
        }
        debug!("chip erased");
        self.respond(wire::ACK)
    }

    fn handle_get_info(&mut self) -> Result<()> {
        let (manufacturer, device) = match self.flash.read_id() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        let jedec = match self.flash.read_jedec_id() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        let mut info = [0u8; wire::INFO_LEN];
        info[0] = manufacturer;
        info[1] = device;
        info[2..5].copy_from_slice(&jedec);
        info[5..9].copy_from_slice(&self.flash.chip().total_size.to_le_bytes());
        info[9..11].copy_from_slice(&(PAGE_SIZE as u16).to_le_bytes());
        info[11..13].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
        self.respond(wire::ACK)?;
        self.serial.send(&info)
    }

    /// Read-and-compare: ACK iff the checksum of the stored region matches
    /// the one the host supplied.
    fn handle_verify(&mut self) -> Result<()> {
        let length = match self.recv_length() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        let address = match self.recv_u32() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        let expected = match self.recv_u16() {
            Ok(v) => v,
            Err(_) => return self.reject(),
        };
        if self.flash.read(address, &mut self.payload[..length]).is_err() {
            return self.reject();
        }
        let actual = crc16(&self.payload[..length]);
        if actual != expected {
            warn!("verify failed at {address:#010x}: {actual:#06x} != {expected:#06x}");
            return self.reject();
        }
        self.respond(wire::ACK)
    }
}

// =============================================================================
// Tests
// =============================================================================
