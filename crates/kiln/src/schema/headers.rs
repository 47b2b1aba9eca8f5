//! Canonical REDCap data dictionary headers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the column shared by choices, calculations and slider labels.
pub const CHOICES_COLUMN: &str = "Choices, Calculations, OR Slider Labels";

/// Name of the column shared by text validation types and slider number display.
pub const VALIDATION_TYPE_COLUMN: &str = "Text Validation Type OR Show Slider Number";

/// One of the fixed target schema's column names.
///
/// Declaration order is significant: it is the REDCap column order and the
/// priority order used when resolving header mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalHeader {
    #[serde(rename = "Variable / Field Name")]
    VariableName,
    #[serde(rename = "Form Name")]
    FormName,
    #[serde(rename = "Field Type")]
    FieldType,
    #[serde(rename = "Field Label")]
    FieldLabel,
    #[serde(rename = "Section Header")]
    SectionHeader,
    #[serde(rename = "Choices, Calculations, OR Slider Labels")]
    Choices,
    #[serde(rename = "Field Note")]
    FieldNote,
    #[serde(rename = "Text Validation Type OR Show Slider Number")]
    ValidationType,
    #[serde(rename = "Text Validation Min")]
    ValidationMin,
    #[serde(rename = "Text Validation Max")]
    ValidationMax,
    #[serde(rename = "Identifier?")]
    Identifier,
    #[serde(rename = "Branching Logic")]
    BranchingLogic,
    #[serde(rename = "Required Field?")]
    RequiredField,
    #[serde(rename = "Custom Alignment")]
    CustomAlignment,
    #[serde(rename = "Question Number (surveys only)")]
    QuestionNumber,
    #[serde(rename = "Field Annotation")]
    FieldAnnotation,
}

impl CanonicalHeader {
    /// Every canonical header in declaration order.
    pub const ALL: [CanonicalHeader; 16] = [
        CanonicalHeader::VariableName,
        CanonicalHeader::FormName,
        CanonicalHeader::FieldType,
        CanonicalHeader::FieldLabel,
        CanonicalHeader::SectionHeader,
        CanonicalHeader::Choices,
        CanonicalHeader::FieldNote,
        CanonicalHeader::ValidationType,
        CanonicalHeader::ValidationMin,
        CanonicalHeader::ValidationMax,
        CanonicalHeader::Identifier,
        CanonicalHeader::BranchingLogic,
        CanonicalHeader::RequiredField,
        CanonicalHeader::CustomAlignment,
        CanonicalHeader::QuestionNumber,
        CanonicalHeader::FieldAnnotation,
    ];

    /// The headers every importable dictionary must carry.
    pub const REQUIRED: [CanonicalHeader; 4] = [
        CanonicalHeader::VariableName,
        CanonicalHeader::FormName,
        CanonicalHeader::FieldType,
        CanonicalHeader::FieldLabel,
    ];

    /// The column name as it appears in a REDCap dictionary.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalHeader::VariableName => "Variable / Field Name",
            CanonicalHeader::FormName => "Form Name",
            CanonicalHeader::FieldType => "Field Type",
            CanonicalHeader::FieldLabel => "Field Label",
            CanonicalHeader::SectionHeader => "Section Header",
            CanonicalHeader::Choices => CHOICES_COLUMN,
            CanonicalHeader::FieldNote => "Field Note",
            CanonicalHeader::ValidationType => VALIDATION_TYPE_COLUMN,
            CanonicalHeader::ValidationMin => "Text Validation Min",
            CanonicalHeader::ValidationMax => "Text Validation Max",
            CanonicalHeader::Identifier => "Identifier?",
            CanonicalHeader::BranchingLogic => "Branching Logic",
            CanonicalHeader::RequiredField => "Required Field?",
            CanonicalHeader::CustomAlignment => "Custom Alignment",
            CanonicalHeader::QuestionNumber => "Question Number (surveys only)",
            CanonicalHeader::FieldAnnotation => "Field Annotation",
        }
    }

    /// Whether this header must be present in every dictionary.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            CanonicalHeader::VariableName
                | CanonicalHeader::FormName
                | CanonicalHeader::FieldType
                | CanonicalHeader::FieldLabel
        )
    }

    /// Look up a header by its exact column name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|h| h.name() == name)
    }

    /// Declaration index, used as mapping priority.
    pub fn priority(&self) -> usize {
        Self::ALL.iter().position(|h| h == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for CanonicalHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_headers_come_first() {
        for (i, header) in CanonicalHeader::REQUIRED.iter().enumerate() {
            assert_eq!(CanonicalHeader::ALL[i], *header);
            assert!(header.is_required());
        }
        assert!(!CanonicalHeader::SectionHeader.is_required());
    }

    #[test]
    fn test_name_lookup_round_trips() {
        for header in CanonicalHeader::ALL {
            assert_eq!(CanonicalHeader::from_name(header.name()), Some(header));
        }
        assert_eq!(CanonicalHeader::from_name("field label"), None);
    }

    #[test]
    fn test_serializes_as_column_name() {
        let json = serde_json::to_string(&CanonicalHeader::Choices).unwrap();
        assert_eq!(json, format!("\"{}\"", CHOICES_COLUMN));
    }
}
