#![allow(dead_code)]

use wisp::{AudioSink, Frame, FrameSink, KeySource, Keys, SerialSink};

/// Builds a cartridge image with the given header fields. The program is placed at the entry point
/// (0x0100) and the first byte of each ROM bank holds the index of that bank.
pub fn build_rom(kind: u8, rom_size: u8, ram_size: u8, program: &[u8]) -> Vec<u8> {
    let banks = 2usize << rom_size;
    let mut rom = vec![0; banks * 0x4000];
    for bank in 1..banks {
        rom[bank * 0x4000] = bank as u8;
    }
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    rom[0x134..0x134 + 4].copy_from_slice(b"TEST");
    rom[0x147] = kind;
    rom[0x148] = rom_size;
    rom[0x149] = ram_size;
    rom[0x14D] = wisp::CartridgeHeader::compute_checksum(&rom);
    rom
}

/// A host that remembers everything the emulator hands it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub frames: usize,
    pub last_frame: Option<Frame>,
    pub polls: usize,
    pub quit_after: Option<usize>,
    pub held: Keys,
    pub audio: Vec<(u16, u8)>,
    pub serial: Vec<u8>,
}

impl FrameSink for RecordingHost {
    fn present(&mut self, frame: &Frame) {
        self.frames += 1;
        self.last_frame = Some(frame.clone());
    }
}

impl KeySource for RecordingHost {
    fn poll(&mut self) -> Keys {
        self.polls += 1;
        let mut keys = self.held;
        if self.quit_after.is_some_and(|n| self.polls > n) {
            keys.request_quit();
        }
        keys
    }
}

impl AudioSink for RecordingHost {
    fn register_write(&mut self, addr: u16, value: u8) {
        self.audio.push((addr, value));
    }
}

impl SerialSink for RecordingHost {
    fn transfer(&mut self, byte: u8) {
        self.serial.push(byte);
    }
}
