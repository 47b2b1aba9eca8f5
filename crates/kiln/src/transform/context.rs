//! Explicit interpreter state: source workbook, active sheet, output accumulator.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::document::{Document, Workbook};
use crate::error::{KilnError, Result};
use crate::schema::CanonicalHeader;

/// The sheet currently selected by `ProcessSheet`.
#[derive(Debug, Clone)]
pub struct ActiveSheet {
    pub name: String,
    pub start_row: usize,
    pub document: Document,
}

/// State threaded through a command sequence.
///
/// Row-level commands target the active sheet when one is selected, else the
/// output accumulator once it exists, else the starting document.
#[derive(Debug, Clone)]
pub struct ExecutionContext<'a> {
    workbook: Option<&'a Workbook>,
    document: Document,
    output: Option<Document>,
    output_name: Option<String>,
    sheet: Option<ActiveSheet>,
    column_mappings: IndexMap<String, String>,
    steps_run: usize,
}

impl<'a> ExecutionContext<'a> {
    /// Context over a single document.
    pub fn new(document: Document) -> Self {
        Self {
            workbook: None,
            document,
            output: None,
            output_name: None,
            sheet: None,
            column_mappings: IndexMap::new(),
            steps_run: 0,
        }
    }

    /// Context over a workbook whose sheets are selected with `ProcessSheet`.
    pub fn with_workbook(workbook: &'a Workbook) -> Self {
        Self {
            workbook: Some(workbook),
            ..Self::new(Document::new())
        }
    }

    /// Number of commands executed so far.
    pub fn steps_run(&self) -> usize {
        self.steps_run
    }

    pub(crate) fn record_step(&mut self) {
        self.steps_run += 1;
    }

    /// Name given by `CreateOutputSheet`, if any.
    pub fn output_name(&self) -> Option<&str> {
        self.output_name.as_deref()
    }

    /// The sheet selected by the last `ProcessSheet`.
    pub fn active_sheet(&self) -> Option<&ActiveSheet> {
        self.sheet.as_ref()
    }

    /// Raw → canonical associations recorded by `MapColumn` in the active sheet.
    pub fn column_mappings(&self) -> &IndexMap<String, String> {
        &self.column_mappings
    }

    pub(crate) fn record_mapping(&mut self, from: &str, to: &str) {
        self.column_mappings.insert(from.to_string(), to.to_string());
    }

    /// The document row-level commands currently write to.
    pub fn target(&self) -> &Document {
        if let Some(sheet) = &self.sheet {
            &sheet.document
        } else if let Some(output) = &self.output {
            output
        } else {
            &self.document
        }
    }

    pub(crate) fn target_mut(&mut self) -> &mut Document {
        if let Some(sheet) = &mut self.sheet {
            &mut sheet.document
        } else if let Some(output) = &mut self.output {
            output
        } else {
            &mut self.document
        }
    }

    /// Start (or fail to restart) the output accumulator.
    pub(crate) fn create_output(&mut self, name: &str) -> Result<()> {
        if self.output.is_some() {
            return Err(KilnError::ScriptOrder(format!(
                "output sheet already created as '{}'",
                self.output_name.as_deref().unwrap_or_default()
            )));
        }
        if self.steps_run > 0 {
            return Err(KilnError::ScriptOrder(
                "CreateOutputSheet must be the first command".to_string(),
            ));
        }
        self.output = Some(Document::new());
        self.output_name = Some(name.to_string());
        Ok(())
    }

    /// Commit the active sheet and load another one from the workbook.
    pub(crate) fn process_sheet(&mut self, name: &str, start_row: usize) -> Result<()> {
        let workbook = self
            .workbook
            .ok_or_else(|| KilnError::UnknownSheet(name.to_string()))?;
        let document = workbook.sheet_document(name, start_row)?;

        self.commit_sheet();
        self.sheet = Some(ActiveSheet {
            name: name.to_string(),
            start_row,
            document,
        });
        Ok(())
    }

    fn commit_sheet(&mut self) {
        if let Some(sheet) = self.sheet.take() {
            self.output
                .get_or_insert_with(Document::new)
                .append(&sheet.document);
            self.column_mappings.clear();
        }
    }

    /// Variable names that a new name in `row` of the target must avoid.
    ///
    /// Covers the other rows of the target plus everything already committed
    /// to the output accumulator.
    pub(crate) fn used_variable_names(&self, row: usize) -> HashSet<String> {
        let column = CanonicalHeader::VariableName.name();
        let mut used = HashSet::new();

        if let Ok(values) = self.target().column_values(column) {
            for (i, value) in values.enumerate() {
                if i + 1 != row && !value.trim().is_empty() {
                    used.insert(value.trim().to_string());
                }
            }
        }

        if self.sheet.is_some() {
            if let Some(Ok(values)) = self.output.as_ref().map(|o| o.column_values(column)) {
                used.extend(
                    values
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from),
                );
            }
        }

        used
    }

    /// Finish the run: commit the active sheet and return the result.
    pub fn finish(mut self) -> Document {
        self.commit_sheet();
        match self.output {
            Some(output) => output,
            None => self.document,
        }
    }
}
