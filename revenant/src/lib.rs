//! Revenant runs a Gameboy ROM headlessly: frames are counted rather than drawn, sound register
//! writes are ignored, and serial output can be printed. It exists to drive the `wisp` core from
//! the command line and from tests.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use wisp::{CartridgeError, CartridgeHeader, ExecError, Gameboy};

pub mod battery;
pub mod config;
pub mod host;

pub use battery::{save_path, FileBattery};
pub use config::{Args, Config};
pub use host::HeadlessHost;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no ROM was given")]
    NoRom,
    #[error("could not access {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("could not encode snapshot: {0}")]
    Snapshot(#[from] postcard::Error),
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub frames: u64,
    pub serial: Vec<u8>,
}

/// Loads the configured ROM, restores its save, and runs it until the frame limit is hit or the
/// interrupt flag is raised. The save is written back and the snapshot taken even if the emulator
/// hit an error.
pub fn run(config: &Config, interrupt: Arc<AtomicBool>) -> Result<Summary, RunError> {
    let rom_path = config.rom.as_deref().ok_or(RunError::NoRom)?;
    let rom = std::fs::read(rom_path).map_err(|source| RunError::Io {
        path: rom_path.to_owned(),
        source,
    })?;
    let header = CartridgeHeader::extract_from_rom(&rom)?;
    let mut battery = FileBattery::new(save_path(
        rom_path,
        &header.title,
        config.save_dir.as_deref(),
    ));
    let mut gb = Gameboy::with_battery(&rom, &mut battery)?;
    let mut host = HeadlessHost::new(config.frames, config.serial).with_interrupt(interrupt);

    let outcome = gb.run(&mut host);
    gb.shutdown(&mut battery)?;
    if let Some(path) = &config.snapshot {
        let bytes = postcard::to_allocvec(&gb)?;
        std::fs::write(path, bytes).map_err(|source| RunError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Wrote snapshot to {path:?}");
    }
    outcome?;

    info!("Stopped after {} frames", host.frames());
    Ok(Summary {
        title: header.title,
        frames: host.frames(),
        serial: host.serial().to_vec(),
    })
}
