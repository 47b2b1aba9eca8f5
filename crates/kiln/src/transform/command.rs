//! The command vocabulary of the transformation language.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{CHOICES_COLUMN, CanonicalHeader, Choice, VALIDATION_TYPE_COLUMN};

/// One primitive table mutation.
///
/// Commands are plain data so a sequence of them is a replayable log. Row
/// arguments are 1-based indices into the active document's data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Add an empty column unless it exists.
    EnsureColumn { column: String },

    /// Rename a column; absent sources are ignored.
    RenameColumn { old: String, new: String },

    /// Treat a raw column as a canonical header.
    MapColumn { from: String, to: String },

    SetFormName { row: usize, form_name: String },

    /// Write a variable name, suffixing `_2`, `_3`, … on collision.
    SetVariableName { row: usize, variable_name: String },

    /// Lowercase an existing variable name, keeping it unique.
    LowercaseVariableName { row: usize },

    /// Write a field type; must be one of the enumerated types.
    SetFieldType { row: usize, field_type: String },

    SetChoices { row: usize, choices: Vec<Choice> },

    SetSlider {
        row: usize,
        min: String,
        min_label: String,
        max: String,
        max_label: String,
    },

    SetFormula { row: usize, formula: String },

    /// Write a date/datetime format into the validation type column.
    SetFormat { row: usize, format: String },

    SetValidation {
        row: usize,
        validation_type: String,
        min: String,
        max: String,
    },

    ClearCell { row: usize, column: String },

    /// Drop rows where any listed column is blank.
    DeleteRowsIfEmpty { columns: Vec<String> },

    /// Start the output accumulator; only valid as the first command.
    CreateOutputSheet { name: String },

    /// Commit the active sheet and switch to another workbook sheet.
    ProcessSheet { name: String, start_row: usize },

    SetCell {
        row: usize,
        column: String,
        value: String,
    },
}

impl Command {
    /// The command's name as written in scripts.
    pub fn name(&self) -> &'static str {
        match self {
            Command::EnsureColumn { .. } => "EnsureColumn",
            Command::RenameColumn { .. } => "RenameColumn",
            Command::MapColumn { .. } => "MapColumn",
            Command::SetFormName { .. } => "SetFormName",
            Command::SetVariableName { .. } => "SetVariableName",
            Command::LowercaseVariableName { .. } => "LowercaseVariableName",
            Command::SetFieldType { .. } => "SetFieldType",
            Command::SetChoices { .. } => "SetChoices",
            Command::SetSlider { .. } => "SetSlider",
            Command::SetFormula { .. } => "SetFormula",
            Command::SetFormat { .. } => "SetFormat",
            Command::SetValidation { .. } => "SetValidation",
            Command::ClearCell { .. } => "ClearCell",
            Command::DeleteRowsIfEmpty { .. } => "DeleteRowsIfEmpty",
            Command::CreateOutputSheet { .. } => "CreateOutputSheet",
            Command::ProcessSheet { .. } => "ProcessSheet",
            Command::SetCell { .. } => "SetCell",
        }
    }

    /// The data row this command addresses, if any.
    pub fn row(&self) -> Option<usize> {
        match self {
            Command::SetFormName { row, .. }
            | Command::SetVariableName { row, .. }
            | Command::LowercaseVariableName { row }
            | Command::SetFieldType { row, .. }
            | Command::SetChoices { row, .. }
            | Command::SetSlider { row, .. }
            | Command::SetFormula { row, .. }
            | Command::SetFormat { row, .. }
            | Command::SetValidation { row, .. }
            | Command::ClearCell { row, .. }
            | Command::SetCell { row, .. } => Some(*row),
            _ => None,
        }
    }

    /// Columns a row-level command writes to.
    pub fn written_columns(&self) -> Vec<&str> {
        match self {
            Command::SetFormName { .. } => vec![CanonicalHeader::FormName.name()],
            Command::SetVariableName { .. } | Command::LowercaseVariableName { .. } => {
                vec![CanonicalHeader::VariableName.name()]
            }
            Command::SetFieldType { .. } => vec![CanonicalHeader::FieldType.name()],
            Command::SetChoices { .. } | Command::SetSlider { .. } | Command::SetFormula { .. } => {
                vec![CHOICES_COLUMN]
            }
            Command::SetFormat { .. } => vec![VALIDATION_TYPE_COLUMN],
            Command::SetValidation { .. } => vec![
                VALIDATION_TYPE_COLUMN,
                CanonicalHeader::ValidationMin.name(),
                CanonicalHeader::ValidationMax.name(),
            ],
            Command::ClearCell { column, .. } | Command::SetCell { column, .. } => {
                vec![column.as_str()]
            }
            _ => Vec::new(),
        }
    }

    /// Human-readable summary used in audit logs.
    pub fn description(&self) -> String {
        match self {
            Command::EnsureColumn { column } => format!("Ensure column '{}'", column),
            Command::RenameColumn { old, new } => format!("Rename '{}' → '{}'", old, new),
            Command::MapColumn { from, to } => format!("Map '{}' → '{}'", from, to),
            Command::DeleteRowsIfEmpty { columns } => {
                format!("Delete rows with blank {}", columns.join(" or "))
            }
            Command::CreateOutputSheet { name } => format!("Create output sheet '{}'", name),
            Command::ProcessSheet { name, start_row } => {
                format!("Process sheet '{}' from row {}", name, start_row)
            }
            other => match other.row() {
                Some(row) => format!(
                    "{} on row {} ({})",
                    other.name(),
                    row,
                    other.written_columns().join(", ")
                ),
                None => other.name().to_string(),
            },
        }
    }
}

/// Quote a string argument for a script line.
pub(crate) fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Renders the command as one script line.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = match self {
            Command::EnsureColumn { column } => vec![quote(column)],
            Command::RenameColumn { old, new } => vec![quote(old), quote(new)],
            Command::MapColumn { from, to } => vec![quote(from), quote(to)],
            Command::SetFormName { row, form_name } => vec![row.to_string(), quote(form_name)],
            Command::SetVariableName { row, variable_name } => {
                vec![row.to_string(), quote(variable_name)]
            }
            Command::LowercaseVariableName { row } => vec![row.to_string()],
            Command::SetFieldType { row, field_type } => vec![row.to_string(), quote(field_type)],
            Command::SetChoices { row, choices } => {
                let pairs: Vec<String> = choices
                    .iter()
                    .map(|c| format!("({}, {})", quote(&c.code), quote(&c.label)))
                    .collect();
                vec![row.to_string(), format!("[{}]", pairs.join(", "))]
            }
            Command::SetSlider {
                row,
                min,
                min_label,
                max,
                max_label,
            } => vec![
                row.to_string(),
                quote(min),
                quote(min_label),
                quote(max),
                quote(max_label),
            ],
            Command::SetFormula { row, formula } => vec![row.to_string(), quote(formula)],
            Command::SetFormat { row, format } => vec![row.to_string(), quote(format)],
            Command::SetValidation {
                row,
                validation_type,
                min,
                max,
            } => vec![row.to_string(), quote(validation_type), quote(min), quote(max)],
            Command::ClearCell { row, column } => vec![row.to_string(), quote(column)],
            Command::DeleteRowsIfEmpty { columns } => {
                let quoted: Vec<String> = columns.iter().map(|c| quote(c)).collect();
                vec![format!("[{}]", quoted.join(", "))]
            }
            Command::CreateOutputSheet { name } => vec![quote(name)],
            Command::ProcessSheet { name, start_row } => vec![quote(name), start_row.to_string()],
            Command::SetCell { row, column, value } => {
                vec![row.to_string(), quote(column), quote(value)]
            }
        };

        write!(f, "{}({})", self.name(), args.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_renders_script_line() {
        let cmd = Command::SetChoices {
            row: 3,
            choices: vec![Choice::new("1", "Yes"), Choice::new("0", "No")],
        };
        assert_eq!(cmd.to_string(), r#"SetChoices(3, [("1", "Yes"), ("0", "No")])"#);

        let cmd = Command::DeleteRowsIfEmpty {
            columns: vec!["Variable / Field Name".to_string()],
        };
        assert_eq!(cmd.to_string(), r#"DeleteRowsIfEmpty(["Variable / Field Name"])"#);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("say \"hi\"\n"), r#""say \"hi\"\n""#);
    }

    #[test]
    fn test_written_columns() {
        let cmd = Command::SetValidation {
            row: 1,
            validation_type: "integer".to_string(),
            min: "0".to_string(),
            max: "120".to_string(),
        };
        assert_eq!(cmd.written_columns().len(), 3);
        assert_eq!(cmd.row(), Some(1));
        assert_eq!(
            Command::EnsureColumn { column: "x".to_string() }.row(),
            None
        );
    }

    #[test]
    fn test_serializes_with_tag() {
        let cmd = Command::SetFieldType {
            row: 2,
            field_type: "radio".to_string(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "set_field_type");
        assert_eq!(json["row"], 2);

        let back: Command = serde_json::from_value(json).unwrap();
        assert_eq!(back, cmd);
    }
}
