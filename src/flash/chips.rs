//! Winbond W25Q chip variants and geometry.

/// Program granule: one page program may carry at most this many bytes and
/// must not cross a boundary at a multiple of it.
pub const PAGE_SIZE: usize = 256;
/// Small erase granule (Sector Erase, opcode 0x20).
pub const SECTOR_SIZE: usize = 4096;
/// Large erase granule (Block Erase, opcode 0xD8).
pub const BLOCK_SIZE: usize = 65536;

/// Static description of one supported chip variant.
///
/// Page, sector, and block geometry is shared by the whole family; only
/// identity and capacity vary per part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashChip {
    /// Chip model name, e.g. "W25Q128".
    pub name: &'static str,
    /// Device ID byte returned by the 0x90 Manufacturer/Device ID command.
    pub device_id: u8,
    /// Total capacity in bytes.
    pub total_size: u32,
}

impl FlashChip {
    /// W25Q64: 8 MiB.
    pub const W25Q64: Self = Self {
        name: "W25Q64",
        device_id: 0x16,
        total_size: 8 * 1024 * 1024,
    };

    /// W25Q128: 16 MiB.
    pub const W25Q128: Self = Self {
        name: "W25Q128",
        device_id: 0x17,
        total_size: 16 * 1024 * 1024,
    };

    /// Check that `len` bytes starting at `addr` stay inside the device.
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        // u64 arithmetic avoids overflow near the top of the address space
        (addr as u64) + (len as u64) <= self.total_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::FlashChip;

    #[test]
    fn range_check_covers_the_end_of_the_device() {
        let chip = FlashChip::W25Q128;
        assert!(chip.is_valid_range(0, chip.total_size as usize));
        assert!(chip.is_valid_range(chip.total_size - 1, 1));
        assert!(!chip.is_valid_range(chip.total_size - 1, 2));
        assert!(!chip.is_valid_range(chip.total_size, 1));
        assert!(!chip.is_valid_range(u32::MAX, 1));
    }

    #[test]
    fn variant_geometry() {
        assert_eq!(FlashChip::W25Q64.total_size, 8 * 1024 * 1024);
        assert_eq!(FlashChip::W25Q128.total_size, 16 * 1024 * 1024);
        assert_ne!(FlashChip::W25Q64.device_id, FlashChip::W25Q128.device_id);
    }
}
