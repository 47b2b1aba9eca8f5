//! Audit records produced while commands execute.

use serde::{Deserialize, Serialize};

/// Result of executing a command sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformResult {
    /// Number of commands executed.
    pub operations_applied: usize,

    /// Number of cells whose value changed.
    pub cells_changed: usize,

    /// Number of columns added.
    pub columns_added: usize,

    /// Number of rows removed.
    pub rows_removed: usize,

    /// Detailed changes for each command.
    pub changes: Vec<TransformChange>,
}

/// The effect of a single command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformChange {
    /// Description of the change.
    pub description: String,

    /// Columns added by this command.
    pub columns_added: Vec<String>,

    /// Rows removed by this command.
    pub rows_removed: usize,

    /// Per-cell audit information.
    pub row_audits: Vec<RowAudit>,
}

/// Audit information for a single cell write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowAudit {
    /// Row index (1-based, within the active sheet).
    pub row: usize,

    /// Column that was changed.
    pub column: String,

    /// Original value before the write.
    pub original_value: String,

    /// New value after the write.
    pub new_value: String,

    /// Command that made the change.
    pub command: String,
}

impl TransformResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a change to the result.
    pub fn add_change(&mut self, change: TransformChange) {
        self.operations_applied += 1;
        self.cells_changed += change.row_audits.len();
        self.columns_added += change.columns_added.len();
        self.rows_removed += change.rows_removed;
        self.changes.push(change);
    }
}

impl TransformChange {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Whether the command left the document untouched.
    pub fn is_noop(&self) -> bool {
        self.columns_added.is_empty() && self.rows_removed == 0 && self.row_audits.is_empty()
    }
}
