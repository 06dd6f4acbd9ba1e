//! The runner's configuration. Settings are read from an optional TOML file and then overridden by
//! whatever was passed on the command line.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::RunError;

/// Runs a Gameboy ROM without a screen.
#[derive(Debug, Default, Parser)]
#[command(version, about)]
pub struct Args {
    /// The path to the ROM to run.
    pub rom: Option<PathBuf>,
    /// A TOML file to read settings from. Flags take precedence over it.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Log every executed instruction.
    #[arg(long)]
    pub show_instr: bool,
    /// Log interrupts, display mode changes, and bank switches.
    #[arg(long)]
    pub show_event: bool,
    /// Print the bytes sent over the serial port to stdout.
    #[arg(long)]
    pub serial: bool,
    /// Stop after this many frames.
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,
    /// Keep battery saves in this directory instead of next to the ROM.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,
    /// Write a snapshot of the emulator to this file when it stops.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,
}

impl Args {
    /// Reads the config file (if one was given) and layers the flags on top of it.
    pub fn into_config(self) -> Result<Config, RunError> {
        let config = match &self.config {
            Some(path) => Config::read(path)?,
            None => Config::default(),
        };
        Ok(self.layer_over(config))
    }

    fn layer_over(self, config: Config) -> Config {
        Config {
            rom: self.rom.or(config.rom),
            show_instr: self.show_instr || config.show_instr,
            show_event: self.show_event || config.show_event,
            serial: self.serial || config.serial,
            frames: self.frames.or(config.frames),
            save_dir: self.save_dir.or(config.save_dir),
            snapshot: self.snapshot.or(config.snapshot),
            filter: config.filter,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rom: Option<PathBuf>,
    pub show_instr: bool,
    pub show_event: bool,
    pub serial: bool,
    pub frames: Option<u64>,
    pub save_dir: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    /// Extra `tracing` directives, appended after the ones implied by the other settings.
    pub filter: Option<String>,
}

impl Config {
    pub fn read(path: &Path) -> Result<Self, RunError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RunError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// The `tracing` directives for these settings.
    pub fn directives(&self) -> String {
        let mut directives = vec!["info"];
        if self.show_instr {
            directives.push("wisp::instr=trace");
        }
        if self.show_event {
            directives.push("wisp::event=debug");
        }
        if self.serial {
            directives.push("wisp::serial=debug");
        }
        if let Some(filter) = &self.filter {
            directives.push(filter);
        }
        directives.join(",")
    }

    /// `RUST_LOG` wins over the settings when it is set.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_defaulted() {
        let config: Config = toml::from_str("show_event = true\nframes = 60").unwrap();
        assert_eq!(
            config,
            Config {
                show_event: true,
                frames: Some(60),
                ..Config::default()
            }
        );
        assert_eq!(toml::from_str::<Config>("").unwrap(), Config::default());
    }

    #[test]
    fn flags_override_the_file() {
        let file = Config {
            rom: Some("file.gb".into()),
            frames: Some(10),
            serial: true,
            filter: Some("wisp=warn".into()),
            ..Config::default()
        };
        let args = Args {
            rom: Some("flag.gb".into()),
            show_instr: true,
            ..Args::default()
        };
        let config = args.layer_over(file);
        assert_eq!(config.rom, Some("flag.gb".into()));
        assert_eq!(config.frames, Some(10));
        assert!(config.serial);
        assert!(config.show_instr);
        assert_eq!(
            config.directives(),
            "info,wisp::instr=trace,wisp::serial=debug,wisp=warn"
        );
    }

    #[test]
    fn cli_parsing() {
        let args = Args::try_parse_from([
            "revenant",
            "game.gb",
            "--show-event",
            "--frames",
            "120",
            "--snapshot",
            "out.snap",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.rom, Some("game.gb".into()));
        assert!(config.show_event);
        assert_eq!(config.frames, Some(120));
        assert_eq!(config.snapshot, Some("out.snap".into()));
        assert_eq!(config.directives(), "info,wisp::event=debug");
    }

    #[test]
    fn reads_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revenant.toml");
        std::fs::write(&path, "rom = \"tetris.gb\"\nsave_dir = \"saves\"\n").unwrap();
        let config = Config::read(&path).unwrap();
        assert_eq!(config.rom, Some("tetris.gb".into()));
        assert_eq!(config.save_dir, Some("saves".into()));

        std::fs::write(&path, "frames = \"many\"").unwrap();
        assert!(matches!(Config::read(&path), Err(RunError::Config(_))));
        assert!(matches!(
            Config::read(&dir.path().join("missing.toml")),
            Err(RunError::Io { .. })
        ));
    }
}
