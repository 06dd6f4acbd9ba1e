use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;
use wisp::BatteryStore;

/// Where the battery-backed RAM of a cartridge is kept. Without a save directory, this is the ROM's
/// path with its extension replaced. Otherwise, the save is named after the cartridge title.
pub fn save_path(rom: &Path, title: &str, save_dir: Option<&Path>) -> PathBuf {
    match save_dir {
        Some(dir) => dir.join(format!("{}.save", title.replace(' ', "_"))),
        None => rom.with_extension("save"),
    }
}

/// A battery store backed by a file. A missing file holds nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBattery {
    path: PathBuf,
}

impl FileBattery {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BatteryStore for FileBattery {
    fn load(&mut self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => {
                debug!("Read save file {:?}", self.path);
                Ok(Some(data))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn store(&mut self, data: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        debug!("Writing save file {:?}", self.path);
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_naming() {
        assert_eq!(
            save_path(Path::new("roms/tetris.gb"), "TETRIS", None),
            PathBuf::from("roms/tetris.save")
        );
        assert_eq!(
            save_path(
                Path::new("roms/zelda.gb"),
                "ZELDA LINKS AWAKE",
                Some(Path::new("saves"))
            ),
            PathBuf::from("saves/ZELDA_LINKS_AWAKE.save")
        );
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBattery::new(dir.path().join("nested").join("game.save"));
        assert_eq!(store.load().unwrap(), None);
        store.store(&[1, 2, 3]).unwrap();
        assert_eq!(store.load().unwrap(), Some(vec![1, 2, 3]));
        store.store(&[4]).unwrap();
        assert_eq!(store.load().unwrap(), Some(vec![4]));
    }
}
