use std::fmt::Debug;
use std::ops::{Index, IndexMut};

mod direct;
mod mbc1;
mod mbc3;
mod mbc5;

pub use direct::*;
pub use mbc1::*;
pub use mbc3::*;
pub use mbc5::*;
use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;
use tracing::{debug, warn};

use crate::rom::{CartridgeHeader, ControllerKind};

/// The size of a ROM banks, 16 KiB.
pub const ROM_BANK_SIZE: usize = 16 * 1024;

/// The size of a RAM banks, 8 KiB.
pub const RAM_BANK_SIZE: usize = 8 * 1024;

/// One 16 KiB bank of cartridge ROM.
#[serde_as]
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomBank(#[serde_as(as = "serde_with::Bytes")] Vec<u8>);

/// One 8 KiB bank of cartridge RAM. Carts with only 2 KiB of RAM have a single short bank that is
/// mirrored across the whole window.
#[serde_as]
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamBank(#[serde_as(as = "serde_with::Bytes")] Vec<u8>);

impl RamBank {
    pub fn new() -> Self {
        Self::with_len(RAM_BANK_SIZE)
    }

    pub fn with_len(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for RamBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects exactly one bank's worth of bytes. Short iterators are padded with `0xFF`, which is
/// what reading from an unpopulated ROM chip returns.
impl FromIterator<u8> for RomBank {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut bank: Vec<u8> = iter.into_iter().take(ROM_BANK_SIZE).collect();
        bank.resize(ROM_BANK_SIZE, 0xFF);
        Self(bank)
    }
}

impl Index<usize> for RomBank {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index % ROM_BANK_SIZE]
    }
}

impl Index<usize> for RamBank {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index % self.0.len()]
    }
}

impl IndexMut<usize> for RamBank {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        let len = self.0.len();
        &mut self.0[index % len]
    }
}

impl Debug for RomBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RomBank {{ .. }}")
    }
}

impl Debug for RamBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RamBank {{ .. }}")
    }
}

/// Splits a cartridge image into ROM banks. The bank count is rounded up to a power of two (with a
/// minimum of two) so that bank numbers can be wrapped with a simple bit mask.
pub(crate) fn rom_banks(cart: &[u8]) -> Box<[RomBank]> {
    let count = cart.len().div_ceil(ROM_BANK_SIZE).next_power_of_two().max(2);
    (0..count)
        .map(|i| {
            cart.iter()
                .skip(i * ROM_BANK_SIZE)
                .take(ROM_BANK_SIZE)
                .copied()
                .collect()
        })
        .collect()
}

/// Builds the external RAM of a cartridge. The bank count is rounded up to a power of two.
pub(crate) fn ram_banks(len: usize) -> Box<[RamBank]> {
    if len < RAM_BANK_SIZE {
        return (len > 0).then(|| RamBank::with_len(len)).into_iter().collect();
    }
    let count = len.div_ceil(RAM_BANK_SIZE);
    let count = if count == 0 {
        0
    } else {
        count.next_power_of_two()
    };
    vec![RamBank::new(); count].into()
}

/// Copies battery-backed data into a set of RAM banks. Returns the number of bytes consumed.
pub(crate) fn load_ram(ram: &mut [RamBank], data: &[u8]) -> usize {
    let mut consumed = 0;
    for (bank, chunk) in ram.iter_mut().zip(data.chunks(RAM_BANK_SIZE)) {
        let len = chunk.len().min(bank.len());
        bank.0[..len].copy_from_slice(&chunk[..len]);
        consumed += len;
    }
    consumed
}

#[derive(Hash, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
pub enum MemoryBankController {
    /// There is no external MBC. The game ROM is mapped into the 32 KiB that starts at 0x0000 and
    /// extends to 0x7FFF. An additional 8 KiB of RAM could be connected. This 8 KiB starts at
    /// 0xA000 and extends to 0xBFFF.
    ///
    /// See the [Pan Docs](https://gbdev.io/pandocs/nombc.html).
    Direct(Direct),
    /// This memory controller is the first MBC chip. It supports up to 2 MiB of ROM and 32 KiB of
    /// RAM, the upper two bank bits being shared between the two depending on the banking mode.
    ///
    /// See the [Pan Docs](https://gbdev.io/pandocs/MBC1.html).
    MBC1(MBC1),
    /// Up to 2 MiB of ROM, 32 KiB of RAM, and (on some carts) a real-time clock.
    ///
    /// See the [Pan Docs](https://gbdev.io/pandocs/MBC3.html).
    MBC3(MBC3),
    /// Up to 8 MiB of ROM and 128 KiB of RAM.
    ///
    /// See the [Pan Docs](https://gbdev.io/pandocs/MBC5.html).
    MBC5(MBC5),
}

impl MemoryBankController {
    pub fn new(cart: &[u8], header: &CartridgeHeader) -> Self {
        let ram_len = header.ram_len();
        debug!(
            target: "wisp::event",
            "Constructing {:?} controller with {} bytes of ROM and {ram_len} bytes of RAM",
            header.kind.controller,
            cart.len(),
        );
        match header.kind.controller {
            ControllerKind::Direct => Direct::new(cart, ram_len).into(),
            ControllerKind::Mbc1 => MBC1::new(cart, ram_len).into(),
            ControllerKind::Mbc3 => MBC3::new(cart, ram_len, header.kind.timer).into(),
            ControllerKind::Mbc5 => MBC5::new(cart, ram_len).into(),
        }
    }

    pub(crate) fn read_byte(&self, index: u16) -> u8 {
        match self {
            MemoryBankController::Direct(controller) => controller.read_byte(index),
            MemoryBankController::MBC1(controller) => controller.read_byte(index),
            MemoryBankController::MBC3(controller) => controller.read_byte(index),
            MemoryBankController::MBC5(controller) => controller.read_byte(index),
        }
    }

    pub(crate) fn write_byte(&mut self, index: u16, value: u8) {
        match self {
            MemoryBankController::Direct(controller) => controller.write_byte(index, value),
            MemoryBankController::MBC1(controller) => controller.write_byte(index, value),
            MemoryBankController::MBC3(controller) => controller.write_byte(index, value),
            MemoryBankController::MBC5(controller) => controller.write_byte(index, value),
        }
    }

    /// Advances any clock on the cartridge by the given number of cycles.
    pub(crate) fn tick(&mut self, cycles: u16) {
        if let MemoryBankController::MBC3(controller) = self {
            controller.tick(cycles)
        }
    }

    /// Returns the contents of the cartridge's persistent storage, i.e. its external RAM followed
    /// by the clock block for carts that carry a clock.
    pub fn save_data(&self) -> Vec<u8> {
        match self {
            MemoryBankController::Direct(controller) => controller.save_data(),
            MemoryBankController::MBC1(controller) => controller.save_data(),
            MemoryBankController::MBC3(controller) => controller.save_data(),
            MemoryBankController::MBC5(controller) => controller.save_data(),
        }
    }

    /// Restores persistent storage previously produced by `save_data`. Data of any other size is
    /// ignored, except that clock carts also accept data without the clock block.
    pub fn load_save_data(&mut self, data: &[u8]) {
        let expected = self.save_data().len();
        let ram_only = match self {
            MemoryBankController::MBC3(controller) if controller.has_clock() => {
                expected - RTC_SAVE_LEN
            }
            _ => expected,
        };
        if data.len() != expected && data.len() != ram_only {
            warn!(
                "Ignoring battery data of {} bytes, expected {expected} bytes",
                data.len()
            );
            return;
        }
        match self {
            MemoryBankController::Direct(controller) => controller.load_save_data(data),
            MemoryBankController::MBC1(controller) => controller.load_save_data(data),
            MemoryBankController::MBC3(controller) => controller.load_save_data(data),
            MemoryBankController::MBC5(controller) => controller.load_save_data(data),
        }
    }
}

impl Debug for MemoryBankController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryBankController::Direct(controller) => write!(f, "{controller:?}"),
            MemoryBankController::MBC1(controller) => write!(f, "{controller}"),
            MemoryBankController::MBC3(controller) => write!(f, "{controller}"),
            MemoryBankController::MBC5(controller) => write!(f, "{controller}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ram_banks, rom_banks, RAM_BANK_SIZE, ROM_BANK_SIZE};

    #[test]
    fn bank_counts_are_powers_of_two() {
        assert_eq!(rom_banks(&[0; 0x150]).len(), 2);
        assert_eq!(rom_banks(&[0; 3 * ROM_BANK_SIZE]).len(), 4);
        assert_eq!(rom_banks(&[0; 5 * ROM_BANK_SIZE + 1]).len(), 8);
        assert_eq!(ram_banks(0).len(), 0);
        assert_eq!(ram_banks(0x800).len(), 1);
        assert_eq!(ram_banks(3 * RAM_BANK_SIZE).len(), 4);
    }

    #[test]
    fn small_ram_is_mirrored() {
        let mut banks = ram_banks(0x800);
        assert_eq!(banks[0].len(), 0x800);
        banks[0][0x0010] = 0x42;
        assert_eq!(banks[0][0x0810], 0x42);
        assert_eq!(banks[0][0x1810], 0x42);
    }

    #[test]
    fn short_banks_are_padded() {
        let banks = rom_banks(&[0x12; 0x150]);
        assert_eq!(banks[0][0x14F], 0x12);
        assert_eq!(banks[0][0x150], 0xFF);
        assert_eq!(banks[1][0], 0xFF);
    }
}
