use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{load_ram, ram_banks, rom_banks, RamBank, RomBank};

/// A cartridge without a bank controller. Two ROM banks are mapped at 0x0000-0x7FFF and an
/// optional bank of RAM sits at 0xA000-0xBFFF.
#[derive(Debug, Hash, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Direct {
    rom: Box<[RomBank]>,
    ram: Box<[RamBank]>,
}

impl Direct {
    pub fn new(cart: &[u8], ram_len: usize) -> Self {
        Self {
            rom: rom_banks(cart),
            ram: ram_banks(ram_len),
        }
    }

    pub fn read_byte(&self, index: u16) -> u8 {
        match index {
            0x0000..0x4000 => self.rom[0][index as usize],
            0x4000..0x8000 => self.rom[1][(index - 0x4000) as usize],
            _ => self
                .ram
                .first()
                .map(|bank| bank[(index - 0xA000) as usize])
                .unwrap_or(0xFF),
        }
    }

    pub fn write_byte(&mut self, index: u16, value: u8) {
        match (index, self.ram.first_mut()) {
            (0xA000..0xC000, Some(bank)) => bank[(index - 0xA000) as usize] = value,
            _ => trace!("Ignoring write of 0x{value:0>2X} to cartridge at 0x{index:0>4X}"),
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
    use super::Direct;

    #[test]
    fn rom_is_read_only() {
        let mut cart = vec![0; 0x8000];
        cart[0x4000] = 0x42;
        let mut mbc = Direct::new(&cart, 0);
        mbc.write_byte(0x4000, 0x00);
        assert_eq!(mbc.read_byte(0x4000), 0x42);
        // No RAM is attached.
        mbc.write_byte(0xA000, 0x12);
        assert_eq!(mbc.read_byte(0xA000), 0xFF);
    }

    #[test]
    fn attached_ram() {
        let mut mbc = Direct::new(&[0; 0x8000], 0x2000);
        mbc.write_byte(0xBFFF, 0x12);
        assert_eq!(mbc.read_byte(0xBFFF), 0x12);
        assert_eq!(mbc.save_data().len(), 0x2000);
    }
}
