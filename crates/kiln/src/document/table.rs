//! The in-memory table every pipeline stage reads and mutates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};

/// Ordered columns and ordered rows of string cells.
///
/// Every row always holds exactly one cell per column. Row addresses in the
/// public API are 1-based, matching the command language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Document {
    /// Create an empty document with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a header row and data rows.
    ///
    /// Short rows are padded and long rows truncated to the header width.
    /// Blank header cells become `column_N` and repeated names get a `.N`
    /// suffix so column names stay unique.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = unique_column_names(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the document has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column with this exact name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append an empty column unless it already exists.
    ///
    /// Returns `true` when the column was added.
    pub fn ensure_column(&mut self, name: &str) -> bool {
        if self.has_column(name) {
            return false;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        true
    }

    /// Read one cell.
    pub fn cell(&self, row: usize, column: &str) -> Result<&str> {
        let col = self.require_column(column)?;
        let idx = self.row_offset(row)?;
        Ok(self.rows[idx][col].as_str())
    }

    /// Read one cell, treating an absent column as empty.
    pub fn cell_or_empty(&self, row: usize, column: &str) -> &str {
        self.cell(row, column).unwrap_or("")
    }

    /// Overwrite one cell and return its previous value.
    pub fn set_cell(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<String> {
        let col = self.require_column(column)?;
        let idx = self.row_offset(row)?;
        Ok(std::mem::replace(&mut self.rows[idx][col], value.into()))
    }

    /// Rename a column.
    ///
    /// Returns `false` when `old` does not exist. Fails with `NameCollision`
    /// when `new` is taken by a different column.
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<bool> {
        let Some(idx) = self.column_index(old) else {
            return Ok(false);
        };
        if old == new {
            return Ok(true);
        }
        if self.has_column(new) {
            return Err(KilnError::NameCollision {
                from: old.to_string(),
                to: new.to_string(),
            });
        }
        self.columns[idx] = new.to_string();
        Ok(true)
    }

    /// Cells of one row in column order.
    pub fn row(&self, row: usize) -> Result<&[String]> {
        let idx = self.row_offset(row)?;
        Ok(&self.rows[idx])
    }

    /// Iterate over rows as `(1-based row, cells)`.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows.iter().enumerate().map(|(i, r)| (i + 1, r.as_slice()))
    }

    /// All values of a column, top to bottom.
    pub fn column_values(&self, name: &str) -> Result<impl Iterator<Item = &str>> {
        let col = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| row[col].as_str()))
    }

    /// Append a data row; it is padded or truncated to the column count.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Remove the rows whose 1-based indices are listed, as one batch.
    ///
    /// Returns the number of rows removed.
    pub fn remove_rows(&mut self, rows: &[usize]) -> usize {
        let doomed: HashSet<usize> = rows.iter().copied().collect();
        let before = self.rows.len();
        let mut position = 0;
        self.rows.retain(|_| {
            position += 1;
            !doomed.contains(&position)
        });
        before - self.rows.len()
    }

    /// Append every row of `other`, matching cells by column name.
    ///
    /// Columns that only `other` has are added to `self` first.
    pub fn append(&mut self, other: &Document) {
        for column in &other.columns {
            self.ensure_column(column);
        }
        let positions: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();

        for source in &other.rows {
            let mut row = vec![String::new(); self.columns.len()];
            for (value, &target) in source.iter().zip(&positions) {
                row[target] = value.clone();
            }
            self.rows.push(row);
        }
    }

    /// Copy of this document restricted to the listed 1-based rows.
    pub fn select_rows(&self, rows: &[usize]) -> Document {
        Document {
            columns: self.columns.clone(),
            rows: rows
                .iter()
                .filter_map(|&r| r.checked_sub(1).and_then(|i| self.rows.get(i)))
                .cloned()
                .collect(),
        }
    }

    /// Copy of this document with exactly the listed columns, in that order.
    ///
    /// Listed columns the document lacks come out empty; others are dropped.
    pub fn project(&self, columns: &[&str]) -> Document {
        let positions: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        Document {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| {
                    positions
                        .iter()
                        .map(|p| p.map(|i| row[i].clone()).unwrap_or_default())
                        .collect()
                })
                .collect(),
        }
    }

    /// Check if a value is blank after trimming.
    pub fn is_blank(value: &str) -> bool {
        value.trim().is_empty()
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| KilnError::UnknownColumn(name.to_string()))
    }

    fn row_offset(&self, row: usize) -> Result<usize> {
        if row == 0 || row > self.rows.len() {
            return Err(KilnError::RowOutOfRange {
                row,
                rows: self.rows.len(),
            });
        }
        Ok(row - 1)
    }
}

fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(columns.len());

    for (i, column) in columns.into_iter().enumerate() {
        let base = if column.trim().is_empty() {
            format!("column_{}", i + 1)
        } else {
            column
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        seen.insert(name.clone());
        unique.push(name);
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_doc(headers: &[&str], rows: &[&[&str]]) -> Document {
        Document::from_rows(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_ensure_column_backfills() {
        let mut doc = make_doc(&["a"], &[&["1"], &["2"]]);
        assert!(doc.ensure_column("b"));
        assert!(!doc.ensure_column("b"));
        assert_eq!(doc.columns(), ["a", "b"]);
        assert_eq!(doc.cell(2, "b").unwrap(), "");
    }

    #[test]
    fn test_cell_errors() {
        let doc = make_doc(&["a"], &[&["1"]]);
        assert!(matches!(doc.cell(1, "zz"), Err(KilnError::UnknownColumn(_))));
        assert!(matches!(
            doc.cell(0, "a"),
            Err(KilnError::RowOutOfRange { row: 0, rows: 1 })
        ));
        assert!(matches!(
            doc.cell(2, "a"),
            Err(KilnError::RowOutOfRange { row: 2, rows: 1 })
        ));
    }

    #[test]
    fn test_set_cell_returns_previous() {
        let mut doc = make_doc(&["a"], &[&["1"]]);
        let previous = doc.set_cell(1, "a", "9").unwrap();
        assert_eq!(previous, "1");
        assert_eq!(doc.cell(1, "a").unwrap(), "9");
    }

    #[test]
    fn test_rename_column() {
        let mut doc = make_doc(&["a", "b"], &[]);
        assert!(!doc.rename_column("missing", "c").unwrap());
        assert!(doc.rename_column("a", "a").unwrap());
        assert!(matches!(
            doc.rename_column("a", "b"),
            Err(KilnError::NameCollision { .. })
        ));
        assert!(doc.rename_column("a", "c").unwrap());
        assert_eq!(doc.columns(), ["c", "b"]);
    }

    #[test]
    fn test_from_rows_pads_and_dedupes() {
        let doc = make_doc(&["x", "x", ""], &[&["1"], &["1", "2", "3", "4"]]);
        assert_eq!(doc.columns(), ["x", "x.1", "column_3"]);
        assert_eq!(doc.row(1).unwrap(), ["1", "", ""]);
        assert_eq!(doc.row(2).unwrap(), ["1", "2", "3"]);
    }

    #[test]
    fn test_remove_rows_is_one_batch() {
        let mut doc = make_doc(&["a"], &[&["1"], &["2"], &["3"], &["4"]]);
        assert_eq!(doc.remove_rows(&[2, 4, 9]), 2);
        let values: Vec<&str> = doc.column_values("a").unwrap().collect();
        assert_eq!(values, vec!["1", "3"]);
    }

    #[test]
    fn test_append_matches_by_name() {
        let mut out = make_doc(&["a", "b"], &[&["1", "2"]]);
        let sheet = make_doc(&["b", "c"], &[&["5", "6"]]);
        out.append(&sheet);

        assert_eq!(out.columns(), ["a", "b", "c"]);
        assert_eq!(out.row(2).unwrap(), ["", "5", "6"]);
        assert_eq!(out.row(1).unwrap(), ["1", "2", ""]);
    }

    #[test]
    fn test_project_orders_and_fills() {
        let doc = make_doc(&["b", "extra", "a"], &[&["2", "x", "1"]]);
        let projected = doc.project(&["a", "b", "c"]);

        assert_eq!(projected.columns(), ["a", "b", "c"]);
        assert_eq!(projected.row(1).unwrap(), ["1", "2", ""]);
    }
}
