//! Wisp is the core crate of the project. It contains all of the logic needed to emulate an
//! original (DMG) Gameboy running a game ROM: the LR35902 CPU, the memory map and its cartridge
//! bank controllers, the display, the timer, and the I/O registers. This crate is agnostic of how
//! (or whether) the emulator is presented. Frontends plug in through the collaborator traits
//! exported here (see [`Host`]).
//!
//! # Notes
//! The LR35902 is little endian. All timings in this crate are counted in T-cycles (4,194,304 per
//! second).

pub mod cpu;
mod error;
mod gameboy;
pub mod instruction;
pub mod lookup;
pub mod mem;
pub mod ppu;
pub mod rom;

pub use error::{CartridgeError, ExecError};
pub use gameboy::{
    AudioSink, BatteryStore, FrameSink, Gameboy, Host, KeySource, SerialSink, Step,
    CYCLES_PER_FRAME,
};
pub use mem::io::{Button, Keys};
pub use ppu::Frame;
pub use rom::CartridgeHeader;
