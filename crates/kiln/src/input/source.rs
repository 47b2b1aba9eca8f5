//! Where each sheet of a workbook came from.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::parser::sheet_name;

/// One input file and the sheet it was read into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub sheet: String,
    pub path: PathBuf,
    /// `sha256:<hex>` of the raw bytes, BOM included.
    pub sha256: String,
    /// Detected delimiter family (csv, tsv, ...).
    pub format: String,
    /// Raw rows, title and header rows included.
    pub raw_rows: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Describe a file from the bytes that were parsed out of it.
    pub fn from_bytes(path: &Path, contents: &[u8], format: impl Into<String>, raw_rows: usize) -> Self {
        Self {
            sheet: sheet_name(path),
            path: path.to_path_buf(),
            sha256: content_hash(contents),
            format: format.into(),
            raw_rows,
            loaded_at: Utc::now(),
        }
    }
}

fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("sha256:{:x}", hasher.finalize())
}
