use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{load_ram, ram_banks, rom_banks, RamBank, RomBank};
use crate::mem::Noted;

/// The real-time clock advances one second every this many cycles.
const RTC_CYCLES_PER_SECOND: u32 = 4_194_304;

/// The size of the clock block appended to the RAM in a battery save: five live registers and
/// five latched registers (each stored as a little-endian `u32`) followed by a little-endian `u64`
/// UNIX timestamp.
pub const RTC_SAVE_LEN: usize = 48;

/// What the 0xA000-0xBFFF window is currently mapped to.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
enum Mbc3Select {
    Ram(u8),
    Rtc(u8),
}

#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
struct RtcRegisters {
    seconds: u8,
    minutes: u8,
    hours: u8,
    /// Nine bits of day counter.
    days: u16,
    halt: bool,
    carry: bool,
}

impl RtcRegisters {
    /// The "day high" register: bit 0 is the ninth day bit, bit 6 halts the clock, and bit 7 is
    /// the day counter's carry.
    fn day_high(&self) -> u8 {
        ((self.days >> 8) as u8 & 0x01) | (self.halt as u8) << 6 | (self.carry as u8) << 7
    }

    fn read(&self, reg: u8) -> u8 {
        match reg {
            0x08 => self.seconds,
            0x09 => self.minutes,
            0x0A => self.hours,
            0x0B => self.days as u8,
            0x0C => self.day_high(),
            _ => 0xFF,
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        match reg {
            0x08 => self.seconds = value & 0x3F,
            0x09 => self.minutes = value & 0x3F,
            0x0A => self.hours = value & 0x1F,
            0x0B => self.days = (self.days & 0x100) | value as u16,
            0x0C => {
                self.days = (self.days & 0xFF) | ((value & 0x01) as u16) << 8;
                self.halt = value & 0x40 != 0;
                self.carry = value & 0x80 != 0;
            }
            _ => {}
        }
    }

    fn to_save(self) -> [u32; 5] {
        [
            self.seconds as u32,
            self.minutes as u32,
            self.hours as u32,
            self.days as u32 & 0xFF,
            self.day_high() as u32,
        ]
    }

    fn from_save(regs: [u32; 5]) -> Self {
        let mut digest = Self::default();
        for (reg, value) in (0x08..=0x0C).zip(regs) {
            digest.write(reg, value as u8);
        }
        digest
    }

    fn advance_seconds(&mut self, seconds: u64) {
        let total = self.seconds as u64 + seconds;
        self.seconds = (total % 60) as u8;
        let total = self.minutes as u64 + total / 60;
        self.minutes = (total % 60) as u8;
        let total = self.hours as u64 + total / 60;
        self.hours = (total % 24) as u8;
        let days = self.days as u64 + total / 24;
        if days > 0x1FF {
            self.carry = true;
        }
        self.days = (days & 0x1FF) as u16;
    }
}

/// The MBC3 real-time clock. The live registers count up while the clock isn't halted, and the
/// game reads a latched copy of them.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rtc {
    live: RtcRegisters,
    latched: RtcRegisters,
    subsecond_cycles: u32,
}

impl Rtc {
    pub(crate) fn tick(&mut self, cycles: u16) {
        if self.live.halt {
            return;
        }
        self.subsecond_cycles += cycles as u32;
        if self.subsecond_cycles >= RTC_CYCLES_PER_SECOND {
            self.subsecond_cycles -= RTC_CYCLES_PER_SECOND;
            self.live.advance_seconds(1);
        }
    }

    fn latch(&mut self) {
        self.latched = self.live;
    }

    fn save_block(&self, now: u64) -> [u8; RTC_SAVE_LEN] {
        let mut block = [0; RTC_SAVE_LEN];
        let regs = self.live.to_save().into_iter().chain(self.latched.to_save());
        for (chunk, reg) in block.chunks_exact_mut(4).zip(regs) {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        block[40..].copy_from_slice(&now.to_le_bytes());
        block
    }

    /// Restores the clock from a save block and credits it with the time that has passed since
    /// the block was written.
    fn restore(block: &[u8], now: u64) -> Option<Self> {
        let block: &[u8; RTC_SAVE_LEN] = block.get(..RTC_SAVE_LEN)?.try_into().ok()?;
        let mut regs = [0u32; 10];
        for (reg, chunk) in regs.iter_mut().zip(block.chunks_exact(4)) {
            *reg = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let mut saved_at = [0; 8];
        saved_at.copy_from_slice(&block[40..]);
        let saved_at = u64::from_le_bytes(saved_at);

        let mut live = RtcRegisters::from_save([regs[0], regs[1], regs[2], regs[3], regs[4]]);
        let latched = RtcRegisters::from_save([regs[5], regs[6], regs[7], regs[8], regs[9]]);
        if !live.halt {
            live.advance_seconds(now.saturating_sub(saved_at));
        }
        Some(Self {
            live,
            latched,
            subsecond_cycles: 0,
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Hash, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MBC3 {
    rom: Box<[RomBank]>,
    ram: Box<[RamBank]>,
    /// Seven bits of ROM bank number. Zero is translated to one.
    rom_bank: u8,
    select: Mbc3Select,
    /// Gates both the RAM and the clock registers.
    ram_enabled: bool,
    /// Latching happens when a 0x00 write is followed by a 0x01 write to 0x6000-0x7FFF.
    latch_armed: bool,
    rtc: Option<Rtc>,
    rom_index_mask: u8,
    #[serde(skip)]
    bad_select_noted: Noted,
}

impl Display for MBC3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "MBC3 {{")?;
        writeln!(f, "  RAMG:  {}", self.ram_enabled)?;
        writeln!(f, "  ROMB:  0x{:0>2X}", self.rom_bank)?;
        writeln!(f, "  SELECT: {:?}", self.select)?;
        writeln!(f, "  RTC: {}", self.rtc.is_some())?;
        writeln!(f, "}}")
    }
}

impl MBC3 {
    pub fn new(cart: &[u8], ram_len: usize, timer: bool) -> Self {
        let rom = rom_banks(cart);
        let rom_index_mask = (rom.len() - 1).min(0x7F) as u8;
        Self {
            rom,
            ram: ram_banks(ram_len),
            rom_bank: 1,
            select: Mbc3Select::Ram(0),
            ram_enabled: false,
            latch_armed: false,
            rtc: timer.then(Rtc::default),
            rom_index_mask,
            bad_select_noted: Noted::default(),
        }
    }

    pub(crate) fn tick(&mut self, cycles: u16) {
        if let Some(rtc) = self.rtc.as_mut() {
            rtc.tick(cycles)
        }
    }

    pub fn read_byte(&self, index: u16) -> u8 {
        match index {
            0x0000..0x4000 => self.rom[0][index as usize],
            0x4000..0x8000 => {
                self.rom[(self.rom_bank & self.rom_index_mask) as usize][(index - 0x4000) as usize]
            }
            _ if !self.ram_enabled => 0xFF,
            _ => match self.select {
                Mbc3Select::Ram(bank) => self
                    .ram
                    .get(bank as usize)
                    .map(|bank| bank[(index - 0xA000) as usize])
                    .unwrap_or(0xFF),
                Mbc3Select::Rtc(reg) => self
                    .rtc
                    .as_ref()
                    .map(|rtc| rtc.latched.read(reg))
                    .unwrap_or(0xFF),
            },
        }
    }

    pub fn write_byte(&mut self, index: u16, value: u8) {
        match index {
            0x0000..0x2000 => self.ram_enabled = (value & 0x0F) == 0x0A,
            0x2000..0x4000 => {
                self.rom_bank = std::cmp::max(value & 0x7F, 1);
                debug!(target: "wisp::event", "MBC3 switched to ROM bank 0x{:0>2X}", self.rom_bank);
            }
            0x4000..0x6000 => match value {
                0x00..=0x03 => self.select = Mbc3Select::Ram(value),
                0x08..=0x0C => self.select = Mbc3Select::Rtc(value),
                _ if self.bad_select_noted.first() => {
                    warn!("Unknown MBC3 RAM/RTC select value: 0x{value:0>2X}")
                }
                _ => trace!("Unknown MBC3 RAM/RTC select value: 0x{value:0>2X}"),
            },
            0x6000..0x8000 => {
                if self.latch_armed && value == 0x01 {
                    if let Some(rtc) = self.rtc.as_mut() {
                        rtc.latch();
                    }
                }
                self.latch_armed = value == 0x00;
            }
            _ if !self.ram_enabled => {
                trace!("Ignoring write to disabled MBC3 RAM at 0x{index:0>4X}")
            }
            _ => match self.select {
                Mbc3Select::Ram(bank) => {
                    if let Some(bank) = self.ram.get_mut(bank as usize) {
                        bank[(index - 0xA000) as usize] = value
                    }
                }
                Mbc3Select::Rtc(reg) => {
                    if let Some(rtc) = self.rtc.as_mut() {
                        if reg == 0x08 {
                            rtc.subsecond_cycles = 0;
                        }
                        rtc.live.write(reg, value)
                    }
                }
            },
        }
    }

    pub(crate) fn save_data(&self) -> Vec<u8> {
        let mut digest: Vec<u8> = self
            .ram
            .iter()
            .flat_map(|bank| bank.0.iter().copied())
            .collect();
        if let Some(rtc) = self.rtc.as_ref() {
            digest.extend(rtc.save_block(unix_now()));
        }
        digest
    }

    pub(crate) fn has_clock(&self) -> bool {
        self.rtc.is_some()
    }

    pub(crate) fn load_save_data(&mut self, data: &[u8]) {
        let consumed = load_ram(&mut self.ram, data);
        if self.rtc.is_none() {
            return;
        }
        let ram_len: usize = self.ram.iter().map(RamBank::len).sum();
        // Battery files that were written before the RAM was fully populated are still accepted.
        let block = &data[consumed.max(ram_len).min(data.len())..];
        match Rtc::restore(block, unix_now()) {
            Some(rtc) => self.rtc = Some(rtc),
            None => debug!(target: "wisp::event", "Battery data carries no clock block"),
        }
    }
}
