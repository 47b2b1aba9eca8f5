//! JSON and text file helpers shared by mapping files, reports and scripts.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{KilnError, Result};

fn io_error(path: &Path, source: std::io::Error) -> KilnError {
    KilnError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
    }
    Ok(())
}

/// Save a value as pretty-printed JSON, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let file = File::create(path).map_err(|e| io_error(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Load a value from a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write a text file, creating parent directories.
pub fn write_text(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, text).map_err(|e| io_error(path, e))
}

/// Read a whole text file.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| io_error(path, e))
}
