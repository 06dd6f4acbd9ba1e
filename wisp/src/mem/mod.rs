use std::hash::{Hash, Hasher};

use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;
use tracing::debug;
use tracing::trace;

use crate::ppu::Ppu;
use crate::rom::CartridgeHeader;

pub mod io;
pub mod mbc;

pub use mbc::MemoryBankController;

use io::{InterruptFlag, IoRegisters};

/// Remembers that a message about an unemulated feature was logged, so that it is only logged
/// once. This is not emulated state: it is never serialized and every latch compares equal.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Noted(bool);

impl Noted {
    /// Returns true the first time that it is called.
    pub(crate) fn first(&mut self) -> bool {
        !std::mem::replace(&mut self.0, true)
    }
}

impl PartialEq for Noted {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Noted {}

impl Hash for Noted {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// This trait is used to abstract over the memory map. This is used during testing.
pub trait MemoryLike {
    fn read_byte(&self, addr: u16) -> u8;

    fn write_byte(&mut self, addr: u16, val: u8);
}

/// The `impl FnOnce` in `update_byte` would make `MemoryLike` non-object safe, which is needs for
/// instrution parsing.
pub trait MemoryLikeExt: MemoryLike {
    fn update_byte(&mut self, addr: u16, op: impl FnOnce(&mut u8)) -> u8 {
        let mut val = self.read_byte(addr);
        op(&mut val);
        self.write_byte(addr, val);
        val
    }
}

/// The owners of the address space.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum Region {
    RomBank0,
    RomBankN,
    Vram,
    CartridgeRam,
    WramBank0,
    WramBank1,
    /// Mirrors 0xC000 through 0xDDFF.
    Echo,
    Oam,
    /// 0xFEA0 through 0xFEFF. Should not be accessed.
    Unusable,
    /// The joypad, serial, timer, interrupt flag, and sound registers.
    Io,
    Lcd,
    OamDma,
    /// The holes in the I/O register range.
    Unmapped,
    Hram,
    InterruptEnable,
}

#[derive(Debug, Clone, Copy)]
struct MappedRange {
    start: u16,
    end: u16,
    region: Region,
}

const fn map(start: u16, end: u16, region: Region) -> MappedRange {
    MappedRange { start, end, region }
}

/// Every address belongs to exactly one entry. Entries are sorted and inclusive at both ends.
const REGIONS: &[MappedRange] = &[
    map(0x0000, 0x3FFF, Region::RomBank0),
    map(0x4000, 0x7FFF, Region::RomBankN),
    map(0x8000, 0x9FFF, Region::Vram),
    map(0xA000, 0xBFFF, Region::CartridgeRam),
    map(0xC000, 0xCFFF, Region::WramBank0),
    map(0xD000, 0xDFFF, Region::WramBank1),
    map(0xE000, 0xFDFF, Region::Echo),
    map(0xFE00, 0xFE9F, Region::Oam),
    map(0xFEA0, 0xFEFF, Region::Unusable),
    map(0xFF00, 0xFF02, Region::Io),
    map(0xFF03, 0xFF03, Region::Unmapped),
    map(0xFF04, 0xFF07, Region::Io),
    map(0xFF08, 0xFF0E, Region::Unmapped),
    map(0xFF0F, 0xFF0F, Region::Io),
    map(0xFF10, 0xFF3F, Region::Io),
    map(0xFF40, 0xFF45, Region::Lcd),
    map(0xFF46, 0xFF46, Region::OamDma),
    map(0xFF47, 0xFF4B, Region::Lcd),
    map(0xFF4C, 0xFF7F, Region::Unmapped),
    map(0xFF80, 0xFFFE, Region::Hram),
    map(0xFFFF, 0xFFFF, Region::InterruptEnable),
];

// The table must cover the address space without gaps or overlaps.
const _: () = {
    let mut next = 0u32;
    let mut i = 0;
    while i < REGIONS.len() {
        assert!(REGIONS[i].start as u32 == next);
        assert!(REGIONS[i].start <= REGIONS[i].end);
        next = REGIONS[i].end as u32 + 1;
        i += 1;
    }
    assert!(next == 0x1_0000);
};

/// Finds the region that owns the given address.
fn region(addr: u16) -> Region {
    let index = REGIONS.partition_point(|range| range.end < addr);
    // The table is total, so the search always lands on an entry.
    REGIONS[index].region
}

/// The work RAM is 8 KiB split into two 4 KiB banks.
const WRAM_SIZE: usize = 0x2000;

/// The 16-bit address space of the console. This is the sole owner of everything the CPU can reach
/// through a load or a store: the cartridge, the work and high RAM, the display, and the I/O
/// registers.
#[serde_as]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMap {
    // The MBC
    mbc: MemoryBankController,
    // The video RAM, the object attribute map, and the LCD registers
    ppu: Ppu,
    // The working RAM
    #[serde_as(as = "serde_with::Bytes")]
    wram: Vec<u8>,
    io: IoRegisters,
    // High RAM
    #[serde_as(as = "serde_with::Bytes")]
    hr: [u8; 0x7F],
    /// ADDR FF46
    /// The source page of the last OAM DMA transfer.
    oam_dma: u8,
    /// The interrupt enable register. Bits 0-4 flag where or not certain interrupt handlers can be
    /// called.
    ///  - Bit 0 corresponds to the VBlank interrupt
    ///  - Bit 1 corresponds to the LCD interrupt
    ///  - Bit 2 corresponds to the timer interrupt
    ///  - Bit 3 corresponds to the serial interrupt
    ///  - Bit 4 corresponds to the joypad interrupt
    /// When indexed, this register is at 0xFFFF.
    pub ie: u8,
}

impl MemoryLike for MemoryMap {
    fn read_byte(&self, addr: u16) -> u8 {
        match region(addr) {
            Region::RomBank0 | Region::RomBankN | Region::CartridgeRam => self.mbc.read_byte(addr),
            Region::Vram => self.ppu.read_vram(addr),
            Region::WramBank0 | Region::WramBank1 => self.wram[(addr - 0xC000) as usize],
            Region::Echo => self.wram[(addr - 0xE000) as usize],
            Region::Oam => self.ppu.read_oam(addr),
            Region::Io => self.io.read_byte(addr),
            Region::Lcd => self.ppu.read_register(addr),
            Region::OamDma => self.oam_dma,
            Region::Hram => self.hr[(addr - 0xFF80) as usize],
            Region::InterruptEnable => self.ie,
            Region::Unusable | Region::Unmapped => {
                trace!("Read from unmapped address 0x{addr:0>4X}");
                0xFF
            }
        }
    }

    /// Unlike indexing, this gives the map control over what gets written. For example, some
    /// registers only have some bits that can be written to and others trigger side effects.
    fn write_byte(&mut self, addr: u16, val: u8) {
        match region(addr) {
            Region::RomBank0 | Region::RomBankN | Region::CartridgeRam => {
                self.mbc.write_byte(addr, val)
            }
            Region::Vram => self.ppu.write_vram(addr, val),
            Region::WramBank0 | Region::WramBank1 => self.wram[(addr - 0xC000) as usize] = val,
            Region::Echo => self.wram[(addr - 0xE000) as usize] = val,
            Region::Oam => self.ppu.write_oam(addr, val),
            Region::Io => self.io.write_byte(addr, val),
            Region::Lcd => {
                if self.ppu.write_register(addr, val) {
                    self.io.request_interrupt(InterruptFlag::Lcd);
                }
            }
            Region::OamDma => self.oam_dma_transfer(val),
            Region::Hram => self.hr[(addr - 0xFF80) as usize] = val,
            Region::InterruptEnable => self.ie = val,
            Region::Unusable | Region::Unmapped => {
                trace!("Write of 0x{val:0>2X} to unmapped address 0x{addr:0>4X}")
            }
        }
    }
}

impl MemoryLikeExt for MemoryMap {}

impl MemoryMap {
    /// Constructs the map as the boot ROM leaves it.
    pub fn new(cart: &[u8], header: &CartridgeHeader) -> Self {
        Self {
            mbc: MemoryBankController::new(cart, header),
            ppu: Ppu::post_boot(),
            wram: vec![0; WRAM_SIZE],
            io: IoRegisters::post_boot(),
            hr: [0; 0x7F],
            oam_dma: 0xFF,
            ie: 0,
        }
    }

    /// Copies 0xA0 bytes from `page << 8` into the OAM. The whole transfer happens at once.
    fn oam_dma_transfer(&mut self, page: u8) {
        self.oam_dma = page;
        let src = (page as u16) << 8;
        debug!(target: "wisp::event", "OAM DMA from 0x{src:0>4X}");
        for i in 0..0xA0 {
            let byte = self.read_byte(src + i);
            self.ppu.write_oam(0xFE00 + i, byte);
        }
    }

    /// Advances the display, the timers, and the cartridge clock by the given number of cycles
    /// and merges their interrupt requests into IF. Returns `true` if a frame was completed.
    pub(crate) fn tick(&mut self, cycles: u16) -> bool {
        let events = self.ppu.tick(cycles);
        if events.vblank {
            self.io.request_interrupt(InterruptFlag::VBlank);
        }
        if events.stat {
            trace!(target: "wisp::event", "STAT interrupt requested");
            self.io.request_interrupt(InterruptFlag::Lcd);
        }
        self.io.tick(cycles);
        self.mbc.tick(cycles);
        events.frame_ready
    }

    /// The interrupts that are both requested and enabled.
    pub fn pending_interrupts(&self) -> u8 {
        self.ie & self.io.interrupt_flags() & 0x1F
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn io(&self) -> &IoRegisters {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IoRegisters {
        &mut self.io
    }

    pub fn mbc(&self) -> &MemoryBankController {
        &self.mbc
    }

    pub fn mbc_mut(&mut self) -> &mut MemoryBankController {
        &mut self.mbc
    }
}

#[cfg(test)]
impl MemoryLike for Vec<u8> {
    fn read_byte(&self, addr: u16) -> u8 {
        self[addr as usize]
    }

    fn write_byte(&mut self, addr: u16, val: u8) {
        self[addr as usize] = val;
    }
}

#[cfg(test)]
impl MemoryLikeExt for Vec<u8> {}

#[cfg(test)]
mod tests {
    use super::{region, MemoryLike, MemoryLikeExt, MemoryMap, Noted, Region, REGIONS};
    use crate::rom::CartridgeHeader;

    fn blank_map() -> MemoryMap {
        let mut cart = vec![0; 0x8000];
        // An MBC1 cart with a single 8 KiB RAM bank
        cart[0x147] = 0x01;
        cart[0x149] = 0x02;
        let header = CartridgeHeader::extract_from_rom(&cart).unwrap();
        MemoryMap::new(&cart, &header)
    }

    #[test]
    fn region_table_covers_address_space() {
        assert_eq!(REGIONS.first().unwrap().start, 0);
        assert_eq!(REGIONS.last().unwrap().end, 0xFFFF);
        for pair in REGIONS.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
        for addr in 0..=0xFFFF {
            let region = region(addr);
            assert!(REGIONS
                .iter()
                .any(|r| r.region == region && (r.start..=r.end).contains(&addr)));
        }
        assert_eq!(region(0x0000), Region::RomBank0);
        assert_eq!(region(0x7FFF), Region::RomBankN);
        assert_eq!(region(0xFF46), Region::OamDma);
        assert_eq!(region(0xFF4C), Region::Unmapped);
        assert_eq!(region(0xFFFF), Region::InterruptEnable);
    }

    #[test]
    fn echo_ram_mirrors_wram() {
        let mut mem = blank_map();
        mem.write_byte(0xC123, 0xAB);
        assert_eq!(mem.read_byte(0xE123), 0xAB);
        mem.write_byte(0xFDFF, 0xCD);
        assert_eq!(mem.read_byte(0xDDFF), 0xCD);
    }

    #[test]
    fn unmapped_addresses() {
        let mut mem = blank_map();
        for addr in [0xFEA0, 0xFEFF, 0xFF03, 0xFF08, 0xFF4C, 0xFF7F] {
            mem.write_byte(addr, 0x00);
            assert_eq!(mem.read_byte(addr), 0xFF, "0x{addr:0>4X}");
        }
    }

    #[test]
    fn ram_regions() {
        let mut mem = blank_map();
        mem.write_byte(0xFF80, 1);
        mem.write_byte(0xFFFE, 2);
        mem.write_byte(0xFFFF, 0x1F);
        mem.write_byte(0x8000, 3);
        mem.write_byte(0xFE9F, 4);
        assert_eq!(mem.read_byte(0xFF80), 1);
        assert_eq!(mem.read_byte(0xFFFE), 2);
        assert_eq!(mem.read_byte(0xFFFF), 0x1F);
        assert_eq!(mem.read_byte(0x8000), 3);
        assert_eq!(mem.read_byte(0xFE9F), 4);
        // Cartridge RAM is disabled until enabled through the controller
        mem.write_byte(0xA000, 5);
        assert_eq!(mem.read_byte(0xA000), 0xFF);
        mem.write_byte(0x0000, 0x0A);
        mem.write_byte(0xA000, 5);
        assert_eq!(mem.read_byte(0xA000), 5);
    }

    #[test]
    fn update_byte_goes_through_registers() {
        let mut mem = blank_map();
        mem.write_byte(0xFF0F, 0);
        assert_eq!(mem.update_byte(0xFF0F, |b| *b |= 0x04), 0xE4);
        assert_eq!(mem.read_byte(0xFF0F), 0xE4);
        assert_eq!(mem.pending_interrupts(), 0);
        mem.write_byte(0xFFFF, 0x04);
        assert_eq!(mem.pending_interrupts(), 0x04);
    }

    #[test]
    fn oam_dma_copies_page() {
        let mut mem = blank_map();
        for i in 0..0xA0 {
            mem.write_byte(0xC100 + i, i as u8);
        }
        mem.write_byte(0xFF46, 0xC1);
        assert_eq!(mem.read_byte(0xFF46), 0xC1);
        for i in 0..0xA0 {
            assert_eq!(mem.read_byte(0xFE00 + i), i as u8);
        }
    }

    #[test]
    fn lcd_registers_route_to_display() {
        let mut mem = blank_map();
        assert_eq!(mem.read_byte(0xFF40), 0x91);
        mem.write_byte(0xFF42, 0x12);
        assert_eq!(mem.read_byte(0xFF42), 0x12);
        assert_eq!(mem.read_byte(0xFF44), 0);
        mem.tick(456);
        assert_eq!(mem.read_byte(0xFF44), 1);
        // Writing LY restarts the frame
        mem.write_byte(0xFF44, 0x99);
        assert_eq!(mem.read_byte(0xFF44), 0);
    }

    #[test]
    fn display_raises_vblank() {
        let mut mem = blank_map();
        let frames = (0..154).filter(|_| mem.tick(456)).count();
        assert_eq!(frames, 1);
        assert_eq!(mem.read_byte(0xFF0F) & 0x01, 0x01);
    }

    #[test]
    fn noted_latches_once() {
        let mut noted = Noted::default();
        let fresh = noted;
        assert!(noted.first());
        assert!(!noted.first());
        assert!(!noted.first());
        assert_eq!(noted, fresh);
    }
}
