use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::LocalBackend;
use crate::error::{CarnetError, Result};

const LOCAL_DIR: &str = "local";
const VALUE_EXT: &str = "json";

/// Local store keeping one file per key under `<data-dir>/local/`.
///
/// The capacity bounds the total size of all stored values, the way a
/// browser bounds an origin's local storage.
pub struct FileLocalStore {
    dir: PathBuf,
    capacity: usize,
}

impl FileLocalStore {
    /// Open (creating if needed) the local store inside `data_dir`.
    pub fn open(data_dir: &Path, capacity: usize) -> Result<Self> {
        let dir = data_dir.join(LOCAL_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, capacity })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CarnetError::invalid("key", format!("'{}' is not a valid storage key", key)));
        }
        Ok(self.dir.join(format!("{}.{}", key, VALUE_EXT)))
    }

    /// Bytes used by every key except `skip`.
    fn used_bytes(&self, skip: &Path) -> Result<usize> {
        let mut used = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            used += entry.metadata()?.len() as usize;
        }
        Ok(used)
    }
}

impl LocalBackend for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let needed = self.used_bytes(&path)? + value.len();
        if needed > self.capacity {
            return Err(CarnetError::QuotaExceeded {
                needed,
                capacity: self.capacity,
            });
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
