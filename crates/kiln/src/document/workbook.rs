//! Named raw sheets, before a header row has been chosen.

use indexmap::IndexMap;

use crate::error::{KilnError, Result};

use super::table::Document;

/// An ordered set of raw sheet grids.
///
/// Sheets are stored headerless; `sheet_document` picks the header row.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: IndexMap<String, Vec<Vec<String>>>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a sheet from raw rows.
    pub fn add_sheet(&mut self, name: impl Into<String>, grid: Vec<Vec<String>>) {
        self.sheets.insert(name.into(), grid);
    }

    /// Wrap a single document as a one-sheet workbook with its header on row 1.
    pub fn from_document(name: impl Into<String>, document: &Document) -> Self {
        let mut grid = Vec::with_capacity(document.row_count() + 1);
        grid.push(document.columns().to_vec());
        grid.extend(document.rows().map(|(_, cells)| cells.to_vec()));

        let mut workbook = Self::new();
        workbook.add_sheet(name, grid);
        workbook
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(|s| s.as_str())
    }

    /// Sheet names with their raw grids, in workbook order.
    pub fn sheets(&self) -> impl Iterator<Item = (&str, &[Vec<String>])> {
        self.sheets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Raw grid of a sheet.
    pub fn grid(&self, name: &str) -> Result<&[Vec<String>]> {
        self.sheets
            .get(name)
            .map(|g| g.as_slice())
            .ok_or_else(|| KilnError::UnknownSheet(name.to_string()))
    }

    /// Number of sheets.
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Read a sheet as a document whose header is the 1-based `start_row`.
    pub fn sheet_document(&self, name: &str, start_row: usize) -> Result<Document> {
        let grid = self.grid(name)?;
        if start_row == 0 || start_row > grid.len() {
            return Err(KilnError::RowOutOfRange {
                row: start_row,
                rows: grid.len(),
            });
        }

        let header = grid[start_row - 1]
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = grid[start_row..].to_vec();
        Ok(Document::from_rows(header, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_sheet_document_uses_start_row() {
        let mut wb = Workbook::new();
        wb.add_sheet(
            "Demographics",
            grid(&[
                &["Study dictionary", ""],
                &["Variable", "Label"],
                &["age", "Age in years"],
            ]),
        );

        let doc = wb.sheet_document("Demographics", 2).unwrap();
        assert_eq!(doc.columns(), ["Variable", "Label"]);
        assert_eq!(doc.row_count(), 1);
        assert_eq!(doc.cell(1, "Label").unwrap(), "Age in years");
    }

    #[test]
    fn test_unknown_sheet_and_bad_start_row() {
        let mut wb = Workbook::new();
        wb.add_sheet("A", grid(&[&["x"]]));

        assert!(matches!(
            wb.sheet_document("B", 1),
            Err(KilnError::UnknownSheet(_))
        ));
        assert!(matches!(
            wb.sheet_document("A", 3),
            Err(KilnError::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_from_document_round_trips() {
        let doc = Document::from_rows(
            vec!["a".to_string()],
            vec![vec!["1".to_string()]],
        );
        let wb = Workbook::from_document("Sheet1", &doc);
        assert_eq!(wb.sheet_document("Sheet1", 1).unwrap(), doc);
    }
}
