use std::io;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::cpu::Cpu;
use crate::error::{CartridgeError, ExecError};
use crate::mem::io::Keys;
use crate::mem::MemoryMap;
use crate::ppu::Frame;
use crate::rom::CartridgeHeader;

/// The number of cycles in a full frame: 154 lines of 456 dots.
pub const CYCLES_PER_FRAME: u32 = 154 * 456;

/// Receives every completed frame.
pub trait FrameSink {
    fn present(&mut self, frame: &Frame);
}

/// Reports which inputs are held. Polled once per step.
pub trait KeySource {
    fn poll(&mut self) -> Keys;
}

/// Receives writes to the sound registers, in the order they happened.
pub trait AudioSink {
    fn register_write(&mut self, addr: u16, value: u8);
}

/// Receives the bytes sent over the serial port.
pub trait SerialSink {
    fn transfer(&mut self, byte: u8);
}

/// Everything that the emulator talks to while it runs. Implemented for any type that provides all
/// four collaborators.
pub trait Host: FrameSink + KeySource + AudioSink + SerialSink {}

impl<T: FrameSink + KeySource + AudioSink + SerialSink> Host for T {}

impl FrameSink for () {
    fn present(&mut self, _frame: &Frame) {}
}

impl KeySource for () {
    fn poll(&mut self) -> Keys {
        Keys::new()
    }
}

impl AudioSink for () {
    fn register_write(&mut self, _addr: u16, _value: u8) {}
}

impl SerialSink for () {
    fn transfer(&mut self, _byte: u8) {}
}

/// Persistent storage for a cartridge's battery-backed RAM (and clock).
pub trait BatteryStore {
    /// Returns the previously stored data, if there is any.
    fn load(&mut self) -> io::Result<Option<Vec<u8>>>;

    fn store(&mut self, data: &[u8]) -> io::Result<()>;
}

/// A store that never holds anything.
impl BatteryStore for () {
    fn load(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn store(&mut self, _data: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// An in-memory store. An empty buffer holds nothing.
impl BatteryStore for Vec<u8> {
    fn load(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok((!self.is_empty()).then(|| self.clone()))
    }

    fn store(&mut self, data: &[u8]) -> io::Result<()> {
        self.clear();
        self.extend_from_slice(data);
        Ok(())
    }
}

/// The outcome of stepping the emulator.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Step {
    /// The emulator ran for the given number of cycles.
    Ran(u32),
    /// The emulator ran for the given number of cycles and completed a frame, which was handed to
    /// the frame sink.
    Frame(u32),
    /// The key source asked to power off. Nothing was run.
    Quit,
}

/// This is the core emulation primative. It contains the entire state machine of the emulated
/// handheld and is agnostic to usecase and how it is rendered (if at all). The `Gameboy` is ticked
/// forward one instruction at a time, talking to the outside world through a [`Host`].
///
/// The whole state can be serialized, which is how snapshots are taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gameboy {
    header: CartridgeHeader,
    cpu: Cpu,
    mem: MemoryMap,
}

impl Gameboy {
    /// Constructs a gameboy with the given cartridge inserted, in the state that the boot ROM
    /// leaves it in.
    pub fn new(rom: &[u8]) -> Result<Self, CartridgeError> {
        let header = CartridgeHeader::extract_from_rom(rom)?;
        info!(
            "Loaded \"{}\" ({:?}, battery: {})",
            header.title, header.kind.controller, header.kind.battery
        );
        let mem = MemoryMap::new(rom, &header);
        Ok(Self {
            header,
            cpu: Cpu::new(),
            mem,
        })
    }

    /// Like [`Gameboy::new`], but also restores the cartridge RAM from the store if the cartridge
    /// has a battery.
    pub fn with_battery(rom: &[u8], store: &mut impl BatteryStore) -> Result<Self, CartridgeError> {
        let mut gb = Self::new(rom)?;
        if gb.header.kind.battery {
            if let Some(data) = store.load()? {
                info!("Restoring {} bytes of cartridge RAM", data.len());
                gb.mem.mbc_mut().load_save_data(&data);
            }
        }
        Ok(gb)
    }

    /// Powers off the emulator and persists the cartridge RAM if the cartridge has a battery.
    pub fn shutdown(&mut self, store: &mut impl BatteryStore) -> Result<(), CartridgeError> {
        self.cpu.power_off();
        if self.header.kind.battery {
            let data = self.mem.mbc().save_data();
            info!("Saving {} bytes of cartridge RAM", data.len());
            store.store(&data)?;
        }
        Ok(())
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn mem(&self) -> &MemoryMap {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut MemoryMap {
        &mut self.mem
    }

    /// The most recently completed frame.
    pub fn frame(&self) -> &Frame {
        self.mem.ppu().frame()
    }

    pub fn is_stopped(&self) -> bool {
        !self.cpu.powered
    }

    /// Runs one instruction, or dispatches one interrupt, and advances the rest of the hardware by
    /// the same number of cycles.
    pub fn step(&mut self, host: &mut impl Host) -> Result<Step, ExecError> {
        if !self.cpu.powered {
            return Ok(Step::Quit);
        }
        let keys = host.poll();
        if keys.quit_requested() {
            info!("Powering off");
            self.cpu.power_off();
            return Ok(Step::Quit);
        }
        self.mem.io_mut().set_keys(keys);

        let cycles = match self.cpu.service_interrupt(&mut self.mem) {
            Some(cycles) => cycles,
            None => self.cpu.step(&mut self.mem)?,
        };
        let frame_ready = self.mem.tick(cycles as u16);
        if frame_ready {
            debug!(target: "wisp::event", "Frame complete");
            host.present(self.mem.ppu().frame());
        }
        for (addr, value) in self.mem.io_mut().drain_audio_writes() {
            host.register_write(addr, value);
        }
        for byte in self.mem.io_mut().drain_serial() {
            host.transfer(byte);
        }

        let cycles = cycles as u32;
        Ok(if frame_ready {
            Step::Frame(cycles)
        } else {
            Step::Ran(cycles)
        })
    }

    /// Steps until a frame is completed. With the display off, no frame ever completes, so this
    /// also returns once a frame's worth of cycles has passed.
    pub fn run_frame(&mut self, host: &mut impl Host) -> Result<Step, ExecError> {
        let mut total = 0;
        while total < CYCLES_PER_FRAME {
            match self.step(host)? {
                Step::Ran(cycles) => total += cycles,
                Step::Frame(cycles) => return Ok(Step::Frame(total + cycles)),
                Step::Quit => return Ok(Step::Quit),
            }
        }
        Ok(Step::Ran(total))
    }

    /// Runs until the key source asks to quit.
    pub fn run(&mut self, host: &mut impl Host) -> Result<(), ExecError> {
        while self.run_frame(host)? != Step::Quit {}
        Ok(())
    }
}
