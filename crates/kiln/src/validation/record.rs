//! Lint report records.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::Result;
use crate::persistence::{load_json, save_json};
use crate::schema::CanonicalHeader;

/// The kind of rule a row violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingRequiredField,
    InvalidVariableName,
    DuplicateVariableName,
    UnknownFieldType,
    MissingChoices,
    MalformedChoices,
    DuplicateChoiceCode,
    UnexpectedChoices,
    MalformedSlider,
    MissingFormula,
    MissingDateFormat,
    IncompleteValidation,
    UnknownValidationType,
    ValidationNotAllowed,
    NonNumericBound,
}

impl ViolationKind {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::MissingRequiredField => "Missing required field",
            ViolationKind::InvalidVariableName => "Invalid variable name",
            ViolationKind::DuplicateVariableName => "Duplicate variable name",
            ViolationKind::UnknownFieldType => "Unknown field type",
            ViolationKind::MissingChoices => "Missing choices",
            ViolationKind::MalformedChoices => "Malformed choices",
            ViolationKind::DuplicateChoiceCode => "Duplicate choice code",
            ViolationKind::UnexpectedChoices => "Unexpected choices",
            ViolationKind::MalformedSlider => "Malformed slider labels",
            ViolationKind::MissingFormula => "Missing calculation",
            ViolationKind::MissingDateFormat => "Missing date format",
            ViolationKind::IncompleteValidation => "Incomplete validation",
            ViolationKind::UnknownValidationType => "Unknown validation type",
            ViolationKind::ValidationNotAllowed => "Validation not allowed",
            ViolationKind::NonNumericBound => "Non-numeric bound",
        }
    }
}

/// One reason a row is not importable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(rule: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Valid/invalid verdict for a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<Violation>,
}

/// One row of the lint report.
///
/// Carries the raw canonical field values at validation time. The inference
/// collaborator may add `inferred_field_type`, `configuration` and
/// `inferred_variable_name` before the record reaches the fix compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// 1-based data row in the linted document.
    pub line: usize,
    pub classification: Classification,

    #[serde(rename = "Variable / Field Name", default)]
    pub variable_name: String,
    #[serde(rename = "Form Name", default)]
    pub form_name: String,
    #[serde(rename = "Field Type", default)]
    pub field_type: String,
    #[serde(rename = "Field Label", default)]
    pub field_label: String,
    #[serde(rename = "Choices, Calculations, OR Slider Labels", default)]
    pub choices: String,
    #[serde(rename = "Text Validation Type OR Show Slider Number", default)]
    pub validation_type: String,
    #[serde(rename = "Text Validation Min", default)]
    pub validation_min: String,
    #[serde(rename = "Text Validation Max", default)]
    pub validation_max: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_variable_name: Option<String>,
}

impl ValidationRecord {
    /// Snapshot the canonical fields of one document row.
    pub fn from_row(document: &Document, row: usize) -> Self {
        let get = |header: CanonicalHeader| document.cell_or_empty(row, header.name()).to_string();
        Self {
            line: row,
            classification: Classification::default(),
            variable_name: get(CanonicalHeader::VariableName),
            form_name: get(CanonicalHeader::FormName),
            field_type: get(CanonicalHeader::FieldType),
            field_label: get(CanonicalHeader::FieldLabel),
            choices: get(CanonicalHeader::Choices),
            validation_type: get(CanonicalHeader::ValidationType),
            validation_min: get(CanonicalHeader::ValidationMin),
            validation_max: get(CanonicalHeader::ValidationMax),
            ..Self::default()
        }
    }

    /// Raw value of a canonical field captured in this record.
    pub fn field(&self, header: CanonicalHeader) -> Option<&str> {
        let value = match header {
            CanonicalHeader::VariableName => &self.variable_name,
            CanonicalHeader::FormName => &self.form_name,
            CanonicalHeader::FieldType => &self.field_type,
            CanonicalHeader::FieldLabel => &self.field_label,
            CanonicalHeader::Choices => &self.choices,
            CanonicalHeader::ValidationType => &self.validation_type,
            CanonicalHeader::ValidationMin => &self.validation_min,
            CanonicalHeader::ValidationMax => &self.validation_max,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn is_valid(&self) -> bool {
        self.classification.valid
    }

    /// Whether an inference collaborator has filled in a field type.
    pub fn has_inference(&self) -> bool {
        self.inferred_field_type
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Counts over a lint report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Violations per rule, in first-seen order.
    pub by_rule: IndexMap<ViolationKind, usize>,
}

impl LintSummary {
    pub fn from_records(records: &[ValidationRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.total += 1;
            if record.is_valid() {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
            }
            for violation in &record.classification.errors {
                *summary.by_rule.entry(violation.rule).or_insert(0) += 1;
            }
        }
        summary
    }

    pub fn has_violations(&self) -> bool {
        self.invalid > 0
    }
}

/// Save a report as a JSON array.
pub fn save_report(records: &[ValidationRecord], path: impl AsRef<Path>) -> Result<()> {
    save_json(records, path)
}

/// Load a report saved by [`save_report`] or augmented externally.
pub fn load_report(path: impl AsRef<Path>) -> Result<Vec<ValidationRecord>> {
    load_json(path)
}

/// Merge per-chunk reports by order-preserving concatenation.
pub fn merge_reports(chunks: impl IntoIterator<Item = Vec<ValidationRecord>>) -> Vec<ValidationRecord> {
    chunks.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_uses_column_names() {
        let record = ValidationRecord {
            line: 3,
            variable_name: "age".to_string(),
            ..ValidationRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["line"], 3);
        assert_eq!(json["Variable / Field Name"], "age");
        assert_eq!(json["classification"]["valid"], false);
        assert!(json.get("inferred_field_type").is_none());
    }

    #[test]
    fn test_augmented_record_parses() {
        let json = r#"{
            "line": 2,
            "classification": {"valid": false, "errors": [
                {"rule": "missing_choices", "message": "radio field has no choices"}
            ]},
            "Variable / Field Name": "sex",
            "Field Type": "radio",
            "inferred_field_type": "radio",
            "configuration": {"choices": [{"code": "1", "label": "Male"}]}
        }"#;
        let record: ValidationRecord = serde_json::from_str(json).unwrap();

        assert!(record.has_inference());
        assert_eq!(record.field_label, "");
        assert_eq!(record.classification.errors[0].rule, ViolationKind::MissingChoices);
    }

    #[test]
    fn test_summary_counts() {
        let mut bad = ValidationRecord::default();
        bad.classification.errors = vec![
            Violation::new(ViolationKind::MissingChoices, "a"),
            Violation::new(ViolationKind::UnknownFieldType, "b"),
        ];
        let mut good = ValidationRecord::default();
        good.classification.valid = true;

        let summary = LintSummary::from_records(&[bad.clone(), good, bad]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.invalid, 2);
        assert_eq!(summary.by_rule[&ViolationKind::MissingChoices], 2);
        assert!(summary.has_violations());
    }

    #[test]
    fn test_merge_preserves_order() {
        let chunk = |lines: &[usize]| {
            lines
                .iter()
                .map(|&line| ValidationRecord {
                    line,
                    ..ValidationRecord::default()
                })
                .collect::<Vec<_>>()
        };
        let merged = merge_reports(vec![chunk(&[1, 2]), chunk(&[3])]);
        let lines: Vec<usize> = merged.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }
}
