use std::io;

use thiserror::Error;

/// Errors raised while constructing a [`Gameboy`](crate::Gameboy) from a cartridge image or while
/// persisting its battery-backed RAM.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("cartridge image is only {len} bytes long and cannot hold a header")]
    TooShort { len: usize },
    #[error("unsupported cartridge type 0x{0:0>2X}")]
    UnsupportedType(u8),
    #[error("battery store failed: {0}")]
    Battery(#[from] io::Error),
}

/// Errors that halt emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("illegal opcode 0x{op:0>2X} at 0x{pc:0>4X}")]
    IllegalOpcode { op: u8, pc: u16 },
}
