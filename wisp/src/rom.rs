use serde::{Deserialize, Serialize};

use crate::CartridgeError;

/// The family of memory bank controller that a cartridge carries.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::IsVariant, Serialize, Deserialize,
)]
pub enum ControllerKind {
    /// No controller. The 32 KiB of ROM are mapped directly.
    Direct,
    Mbc1,
    Mbc3,
    Mbc5,
}

/// The decoded form of the cartridge type byte at `0x147`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeKind {
    pub controller: ControllerKind,
    /// Whether the external RAM is battery-backed and should be persisted between sessions.
    pub battery: bool,
    /// Whether the cartridge carries a real-time clock. Only MBC3 cartridges do.
    pub timer: bool,
}

impl CartridgeKind {
    pub fn from_byte(byte: u8) -> Result<Self, CartridgeError> {
        use ControllerKind::*;
        let (controller, battery, timer) = match byte {
            0x00 => (Direct, false, false),
            0x01 | 0x02 => (Mbc1, false, false),
            0x03 => (Mbc1, true, false),
            0x0F | 0x10 => (Mbc3, true, true),
            0x11 | 0x12 => (Mbc3, false, false),
            0x13 => (Mbc3, true, false),
            0x19 | 0x1A | 0x1C | 0x1D => (Mbc5, false, false),
            0x1B | 0x1E => (Mbc5, true, false),
            n => return Err(CartridgeError::UnsupportedType(n)),
        };
        Ok(Self {
            controller,
            battery,
            timer,
        })
    }
}

/// This struct represents a DMG ROM header. Per the Pan Docs, the header of the ROM occupies the
/// region between `0x100` and `0x14F`. Only the fields that the emulator acts on are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeHeader {
    /// The memory region between `0x134` and `0x143`. The title ends at the first NUL byte.
    pub title: String,
    /// The unsigned byte at `0x147`.
    pub kind: CartridgeKind,
    /// The unsigned byte at `0x148`. Communicates the length of the ROM as a multiple of 32 KiB,
    /// i.e. `32 * (1 << rom_size)`. The emulator sizes the ROM from the image length instead.
    pub rom_size: u8,
    /// The unsigned byte at `0x149`.
    pub ram_size: u8,
    /// The unsigned byte at `0x14D`. On start, the boot ROM checksums the bytes `0x134..0x14D`
    /// and refuses to boot if the result doesn't match this value.
    pub header_checksum: u8,
}

impl CartridgeHeader {
    pub const START_ADDR: usize = 0x100;
    pub const END_ADDR: usize = 0x14F;
    pub const LENGTH: usize = Self::END_ADDR - Self::START_ADDR + 1;

    pub fn extract_from_rom(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() <= Self::END_ADDR {
            return Err(CartridgeError::TooShort { len: rom.len() });
        }
        let title = rom[0x134..=0x143]
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| *b as char)
            .collect();
        Ok(Self {
            title,
            kind: CartridgeKind::from_byte(rom[0x147])?,
            rom_size: rom[0x148],
            ram_size: rom[0x149],
            header_checksum: rom[0x14D],
        })
    }

    /// The number of bytes of external RAM that the cartridge advertises.
    pub fn ram_len(&self) -> usize {
        match self.ram_size {
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            _ => 0,
        }
    }

    /// Computes the header checksum the same way that the boot ROM does.
    pub fn compute_checksum(rom: &[u8]) -> u8 {
        rom[0x134..0x14D]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_sub(*b).wrapping_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        rom::{CartridgeHeader, CartridgeKind, ControllerKind},
        CartridgeError,
    };

    fn rom_with(kind: u8, ram_size: u8) -> Vec<u8> {
        let mut rom = vec![0; 0x8000];
        rom[0x134..0x139].copy_from_slice(b"TETRA");
        rom[0x147] = kind;
        rom[0x149] = ram_size;
        rom[0x14D] = CartridgeHeader::compute_checksum(&rom);
        rom
    }

    #[test]
    fn header_extraction() {
        let rom = rom_with(0x03, 0x02);
        let header = CartridgeHeader::extract_from_rom(&rom).unwrap();
        println!("{header:#02X?}");
        assert_eq!(header.title, "TETRA");
        assert_eq!(header.kind.controller, ControllerKind::Mbc1);
        assert!(header.kind.battery);
        assert_eq!(header.ram_len(), 0x2000);
        assert_eq!(
            CartridgeHeader::compute_checksum(&rom),
            header.header_checksum
        );
    }

    #[test]
    fn ram_size_table() {
        let lens = [0, 0x800, 0x2000, 0x8000, 0x20000, 0x10000];
        for (code, len) in lens.into_iter().enumerate() {
            let header = CartridgeHeader::extract_from_rom(&rom_with(0x03, code as u8)).unwrap();
            assert_eq!(header.ram_len(), len, "RAM size code 0x{code:0>2X}");
        }
    }

    #[test]
    fn short_images_are_rejected() {
        let err = CartridgeHeader::extract_from_rom(&[0; 0x100]).unwrap_err();
        assert!(matches!(err, CartridgeError::TooShort { len: 0x100 }));
    }

    #[test]
    fn cartridge_type_table() {
        for byte in 0..=0xFF {
            let res = CartridgeKind::from_byte(byte);
            match byte {
                0x00..=0x03 | 0x0F..=0x13 | 0x19..=0x1E => {
                    let kind = res.unwrap();
                    let battery = matches!(byte, 0x03 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E);
                    assert_eq!(kind.battery, battery, "type 0x{byte:0>2X}");
                    assert_eq!(kind.timer, matches!(byte, 0x0F | 0x10));
                }
                _ => assert!(matches!(res, Err(CartridgeError::UnsupportedType(b)) if b == byte)),
            }
        }
    }
}
