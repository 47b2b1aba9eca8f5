//! CSV/TSV reading and writing with delimiter detection.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::source::SourceMetadata;
use crate::document::{Document, Workbook};
use crate::error::{KilnError, Result};
use crate::persistence::ensure_parent;

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Maximum raw rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Reads delimited files into raw grids, documents and workbooks.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read a file as a headerless grid of cells.
    pub fn read_grid(&self, path: impl AsRef<Path>) -> Result<(Vec<Vec<String>>, SourceMetadata)> {
        let path = path.as_ref();
        let io_err = |e| KilnError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(io_err)?;

        let body = contents.strip_prefix(UTF8_BOM).unwrap_or(&contents[..]);
        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(body)?,
        };
        let grid = self.parse_bytes(body, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        };

        let metadata = SourceMetadata::from_bytes(path, &contents, format, grid.len());
        debug!(sheet = %metadata.sheet, rows = metadata.raw_rows, format, "read grid");

        Ok((grid, metadata))
    }

    /// Read a file whose first row is the header.
    pub fn read_document(&self, path: impl AsRef<Path>) -> Result<(Document, SourceMetadata)> {
        let path = path.as_ref();
        let (grid, metadata) = self.read_grid(path)?;
        let mut rows = grid.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| KilnError::EmptyData(format!("{} has no header row", path.display())))?;
        Ok((Document::from_rows(header, rows.collect()), metadata))
    }

    /// Read several files as one workbook, one sheet per file named by its stem.
    pub fn read_workbook(&self, paths: &[PathBuf]) -> Result<(Workbook, Vec<SourceMetadata>)> {
        let mut workbook = Workbook::new();
        let mut sources = Vec::with_capacity(paths.len());

        for path in paths {
            let (grid, metadata) = self.read_grid(path)?;
            workbook.add_sheet(sheet_name(path), grid);
            sources.push(metadata);
        }

        Ok((workbook, sources))
    }

    /// Parse bytes into rows; nothing is treated as a header.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        if rows.is_empty() {
            return Err(KilnError::EmptyData("No rows found".to_string()));
        }
        Ok(rows)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Sheet name used for a file: its stem.
pub fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string())
}

/// Write a document as comma-separated values, header first.
///
/// Missing parent directories are created.
pub fn write_document(document: &Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| KilnError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_document_to(document, file)
}

/// Write a document to any writer.
pub fn write_document_to<W: Write>(document: &Document, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(document.columns())?;
    for (_, row) in document.rows() {
        writer.write_record(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(KilnError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let variance = counts
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / counts.len() as f64;

        // Tab wins ties; it rarely occurs inside labels.
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
