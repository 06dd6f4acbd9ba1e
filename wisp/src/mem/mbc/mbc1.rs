use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;
use tracing::{debug, trace};

use super::{load_ram, ram_banks, rom_banks, RamBank, RomBank};

#[derive(Debug, Hash, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MBC1 {
    rom: Box<[RomBank]>,
    ram: Box<[RamBank]>,
    /// The lower five bits of the ROM bank number. Written through 0x2000-0x3FFF. A value of zero
    /// is translated to one.
    bank_index_one: u8,
    /// Two extra bits that either extend the ROM bank number or select the RAM bank, depending on
    /// the banking mode. Written through 0x4000-0x5FFF.
    bank_index_two: u8,
    /// Determines if RAM can be read from and written to. The actual hardware uses an 8-bit
    /// register, so RAM is enabled when the lower nibble is `0xA`.
    ///
    /// Initially set to `false`, any writes to the memory addresses 0x0000 through 0x1FFF write to
    /// this register.
    ram_enabled: bool,
    /// Determines the banking mode. Any writes to the memory addresses 0x6000 through 0x7FFF write
    /// to this register, only the lowest bit is used.
    banking_mode: BankingMode,

    /// Calculated on construction and does not represent a register. Rather, it models the wiring
    /// to the banks on a cart. For example, if a cart only has four ROM banks, the highest needed
    /// index to a bank is three.
    ///
    /// This relies on the number of ROM banks being a power of two; otherwise, a simple bit
    /// mask would not work.
    rom_index_mask: u8,
    ram_index_mask: u8,
}

impl Display for MBC1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "MBC1 {{")?;
        writeln!(f, "  MODE:  {}", self.banking_mode)?;
        writeln!(f, "  RAMG:  {}", self.ram_enabled)?;
        writeln!(f, "  BANK1: 0b{:0>8b}", self.bank_index_one)?;
        writeln!(f, "  BANK2: 0b{:0>8b}", self.bank_index_two)?;
        writeln!(f, "  ROM mask: 0b{:0>8b}", self.rom_index_mask)?;
        writeln!(f, "  RAM mask: 0b{:0>8b}", self.ram_index_mask)?;
        writeln!(f, "  rom_bank: 0x{:0>2X}", self.rom_bank())?;
        writeln!(f, "}}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum BankingMode {
    Simple = 0,
    Advanced = 1,
}

impl BankingMode {
    fn from_byte(value: u8) -> Self {
        if (value & 0x1) == 0 {
            Self::Simple
        } else {
            Self::Advanced
        }
    }
}

impl MBC1 {
    pub fn new(cart: &[u8], ram_len: usize) -> Self {
        let rom = rom_banks(cart);
        let ram = ram_banks(ram_len);
        let rom_index_mask = (rom.len() - 1) as u8;
        let ram_index_mask = ram.len().saturating_sub(1) as u8;
        Self {
            rom,
            ram,
            bank_index_one: 1,
            bank_index_two: 0,
            ram_enabled: false,
            banking_mode: BankingMode::Simple,
            rom_index_mask,
            ram_index_mask,
        }
    }

    #[inline]
    fn first_rom_bank(&self) -> usize {
        let base = matches!(self.banking_mode, BankingMode::Advanced)
            .then(|| self.bank_index_two << 5)
            .unwrap_or_default();

        (base & self.rom_index_mask) as usize
    }

    #[inline]
    fn rom_bank(&self) -> usize {
        let bank = self.bank_index_two << 5 | self.bank_index_one;

        (bank & self.rom_index_mask) as usize
    }

    /// NOTE: This does *not* take RAM enablement into consideration.
    #[inline]
    fn ram_bank(&self) -> usize {
        (matches!(self.banking_mode, BankingMode::Advanced)
            .then_some(self.bank_index_two)
            .unwrap_or_default()
            & self.ram_index_mask) as usize
    }

    #[inline]
    pub fn read_byte(&self, index: u16) -> u8 {
        match index {
            0x0000..0x4000 => self.rom[self.first_rom_bank()][index as usize],
            0x4000..0x8000 => self.rom[self.rom_bank()][(index - 0x4000) as usize],
            _ => match self.ram.get(self.ram_bank()) {
                Some(bank) if self.ram_enabled => bank[(index - 0xA000) as usize],
                _ => 0xFF,
            },
        }
    }

    /// Writes to a register or RAM bank
    #[inline]
    pub fn write_byte(&mut self, index: u16, value: u8) {
        match index {
            0x0000..0x2000 => self.ram_enabled = (value & 0x0F) == 0b1010,
            0x2000..0x4000 => {
                self.bank_index_one = std::cmp::max(0x1F & value, 1);
                debug!(target: "wisp::event", "MBC1 switched to ROM bank 0x{:0>2X}", self.rom_bank());
            }
            0x4000..0x6000 => {
                self.bank_index_two = 0x3 & value;
            }
            0x6000..0x8000 => {
                self.banking_mode = BankingMode::from_byte(value);
            }
            _ => {
                let bank = self.ram_bank();
                match self.ram.get_mut(bank) {
                    Some(bank) if self.ram_enabled => bank[(index - 0xA000) as usize] = value,
                    _ => trace!("Ignoring write to disabled MBC1 RAM at 0x{index:0>4X}"),
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
    use crate::mem::mbc::BankingMode;
    use crate::mem::mbc::RamBank;
    use crate::mem::mbc::RomBank;
    use crate::mem::mbc::ROM_BANK_SIZE;

    use super::MBC1;

    fn banked_mbc() -> MBC1 {
        let rom = (0..128)
            .map(|i| std::iter::repeat(i).collect::<RomBank>())
            .collect();
        MBC1 {
            rom,
            ram: vec![RamBank::new(); 4].into(),
            bank_index_one: 0x12,
            bank_index_two: 0x01,
            ram_enabled: false,
            banking_mode: BankingMode::Simple,
            rom_index_mask: u8::MAX >> 1,
            ram_index_mask: 3,
        }
    }

    // This test comes from the complete technical reference
    #[test]
    fn rom_bank_example_one() {
        let mut mbc = banked_mbc();

        // While in simple mode
        let bank_one = mbc.read_byte(0x0000);
        assert_eq!(bank_one, 0);
        let bank_one = mbc.read_byte(0x3FFF);
        assert_eq!(bank_one, 0);

        let bank_two = mbc.read_byte(0x4000);
        assert_eq!(bank_two, 0x32);
        let bank_two = mbc.read_byte(0x7FFF);
        assert_eq!(bank_two, 0x32);

        // While in advanced mode
        mbc.banking_mode = BankingMode::Advanced;
        let bank_one = mbc.read_byte(0x0000);
        assert_eq!(bank_one, 0x20);
        let bank_one = mbc.read_byte(0x3FFF);
        assert_eq!(bank_one, 0x20);

        let bank_two = mbc.read_byte(0x4000);
        assert_eq!(bank_two, 0x32);
        let bank_two = mbc.read_byte(0x7FFF);
        assert_eq!(bank_two, 0x32);
    }

    // This test comes from the complete technical reference
    #[test]
    fn rom_bank_example_two() {
        let mut mbc = banked_mbc();

        mbc.bank_index_one = 0b00100;
        mbc.bank_index_two = 0b10;
        assert_eq!(mbc.rom_bank(), 0x44);

        let bank_one = mbc.read_byte(0x0000);
        assert_eq!(bank_one, 0);
        let bank_two = mbc.read_byte(0x4000);
        assert_eq!(bank_two, 0x44);
        let bank_two = mbc.read_byte(0x7FFF);
        assert_eq!(bank_two, 0x44);
    }

    #[test]
    fn bank_zero_selects_bank_one() {
        let cart: Vec<u8> = (0..4u8)
            .flat_map(|i| std::iter::repeat(i).take(ROM_BANK_SIZE))
            .collect();
        let mut mbc = MBC1::new(&cart, 0);
        mbc.write_byte(0x2000, 0x00);
        assert_eq!(mbc.read_byte(0x4000), 1);
        mbc.write_byte(0x2000, 0x03);
        assert_eq!(mbc.read_byte(0x4000), 3);
        // Only the bits that are wired to the four banks are kept.
        mbc.write_byte(0x2000, 0x06);
        assert_eq!(mbc.read_byte(0x4000), 2);
    }

    #[test]
    fn ram_gating_and_banking() {
        let mut mbc = banked_mbc();
        mbc.write_byte(0xA000, 0x12);
        assert_eq!(mbc.read_byte(0xA000), 0xFF);

        mbc.write_byte(0x0000, 0x0A);
        mbc.write_byte(0xA000, 0x12);
        assert_eq!(mbc.read_byte(0xA000), 0x12);

        // Selecting RAM bank 2 requires the advanced banking mode.
        mbc.write_byte(0x6000, 0x01);
        mbc.write_byte(0x4000, 0x02);
        assert_eq!(mbc.read_byte(0xA000), 0x00);
        mbc.write_byte(0xA000, 0x34);
        mbc.write_byte(0x4000, 0x00);
        assert_eq!(mbc.read_byte(0xA000), 0x12);

        mbc.write_byte(0x0000, 0x00);
        assert_eq!(mbc.read_byte(0xA000), 0xFF);

        let save = mbc.save_data();
        assert_eq!(save[0], 0x12);
        assert_eq!(save[2 * 0x2000], 0x34);
    }

    #[test]
    fn bank_mode_creation() {
        (0..u8::MAX).for_each(|i| assert_eq!(BankingMode::from_byte(i) as u8, 0x1 & i))
    }
}
