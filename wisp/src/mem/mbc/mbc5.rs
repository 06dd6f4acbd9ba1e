use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{load_ram, ram_banks, rom_banks, RamBank, RomBank};

#[derive(Debug, Hash, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MBC5 {
    rom: Box<[RomBank]>,
    ram: Box<[RamBank]>,
    /// Nine bits of ROM bank number. The low eight are written through 0x2000-0x2FFF and the ninth
    /// through 0x3000-0x3FFF. Unlike the other controllers, bank zero can be mapped.
    rom_bank: u16,
    ram_bank: u8,
    ram_enabled: bool,
    rom_index_mask: u16,
    ram_index_mask: u8,
}

impl Display for MBC5 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "MBC5 {{")?;
        writeln!(f, "  RAMG:  {}", self.ram_enabled)?;
        writeln!(f, "  ROMB:  0x{:0>3X}", self.rom_bank)?;
        writeln!(f, "  RAMB:  0x{:0>2X}", self.ram_bank)?;
        writeln!(f, "}}")
    }
}

impl MBC5 {
    pub fn new(cart: &[u8], ram_len: usize) -> Self {
        let rom = rom_banks(cart);
        let ram = ram_banks(ram_len);
        let rom_index_mask = (rom.len() - 1).min(0x1FF) as u16;
        let ram_index_mask = ram.len().saturating_sub(1) as u8;
        Self {
            rom,
            ram,
            rom_bank: 1,
            ram_bank: 0,
            ram_enabled: false,
            rom_index_mask,
            ram_index_mask,
        }
    }

    fn current_rom_bank(&self) -> usize {
        (self.rom_bank & self.rom_index_mask) as usize
    }

    pub fn read_byte(&self, index: u16) -> u8 {
        match index {
            0x0000..0x4000 => self.rom[0][index as usize],
            0x4000..0x8000 => self.rom[self.current_rom_bank()][(index - 0x4000) as usize],
            _ => match self.ram.get((self.ram_bank & self.ram_index_mask) as usize) {
                Some(bank) if self.ram_enabled => bank[(index - 0xA000) as usize],
                _ => 0xFF,
            },
        }
    }

    pub fn write_byte(&mut self, index: u16, value: u8) {
        match index {
            0x0000..0x2000 => self.ram_enabled = (value & 0x0F) == 0x0A,
            0x2000..0x3000 => {
                self.rom_bank = (self.rom_bank & 0x100) | value as u16;
                debug!(target: "wisp::event", "MBC5 switched to ROM bank 0x{:0>3X}", self.rom_bank);
            }
            0x3000..0x4000 => {
                self.rom_bank = (self.rom_bank & 0xFF) | ((value & 0x01) as u16) << 8;
                debug!(target: "wisp::event", "MBC5 switched to ROM bank 0x{:0>3X}", self.rom_bank);
            }
            0x4000..0x6000 => self.ram_bank = value & 0x0F,
            0x6000..0x8000 => trace!("Ignoring write of 0x{value:0>2X} to MBC5 at 0x{index:0>4X}"),
            _ => {
                let bank = (self.ram_bank & self.ram_index_mask) as usize;
                match self.ram.get_mut(bank) {
                    Some(bank) if self.ram_enabled => bank[(index - 0xA000) as usize] = value,
                    _ => trace!("Ignoring write to disabled MBC5 RAM at 0x{index:0>4X}"),
                }
            }
        }
    }

    pub(crate) fn save_data(&self) -> Vec<u8> {
        self.ram.iter().flat_map(|bank| bank.0.iter().copied()).collect()
    }

    pub(crate) fn load_save_data(&mut self, data: &[u8]) {
        load_ram(&mut self.ram, data);
    }
}

#[cfg(test)]
mod tests {
    use super::MBC5;
    use crate::mem::mbc::ROM_BANK_SIZE;

    /// Builds a 512 bank cart where the first two bytes of each bank hold its bank number.
    fn big_cart() -> Vec<u8> {
        let mut cart = vec![0; 512 * ROM_BANK_SIZE];
        for (i, bank) in cart.chunks_mut(ROM_BANK_SIZE).enumerate() {
            bank[..2].copy_from_slice(&(i as u16).to_le_bytes());
        }
        cart
    }

    fn mapped_bank(mbc: &MBC5) -> u16 {
        u16::from_le_bytes([mbc.read_byte(0x4000), mbc.read_byte(0x4001)])
    }

    #[test]
    fn nine_bit_rom_banking() {
        let mut mbc = MBC5::new(&big_cart(), 0);
        assert_eq!(mapped_bank(&mbc), 1);

        mbc.write_byte(0x2000, 0x34);
        assert_eq!(mapped_bank(&mbc), 0x34);

        mbc.write_byte(0x3000, 0x01);
        assert_eq!(mapped_bank(&mbc), 0x134);

        mbc.write_byte(0x2000, 0xFF);
        assert_eq!(mapped_bank(&mbc), 0x1FF);

        // Bank zero can be mapped into the switchable region
        mbc.write_byte(0x3000, 0x00);
        mbc.write_byte(0x2000, 0x00);
        assert_eq!(mapped_bank(&mbc), 0);
    }

    #[test]
    fn ram_banking() {
        let mut mbc = MBC5::new(&big_cart(), 0x20000);
        mbc.write_byte(0x0000, 0x0A);
        mbc.write_byte(0x4000, 0x0F);
        mbc.write_byte(0xA000, 0xAB);
        mbc.write_byte(0x4000, 0x00);
        assert_eq!(mbc.read_byte(0xA000), 0x00);
        mbc.write_byte(0x4000, 0x0F);
        assert_eq!(mbc.read_byte(0xA000), 0xAB);
        assert_eq!(mbc.save_data()[15 * 0x2000], 0xAB);
    }
}
