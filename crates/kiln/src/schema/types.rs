//! Field types, validation types and variable naming rules.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KilnError;

/// Longest variable name REDCap accepts.
pub const MAX_VARIABLE_NAME_LEN: usize = 26;

static VARIABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,25}$").expect("valid variable name regex"));

static NON_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid identifier regex"));

/// REDCap field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Notes,
    Radio,
    Checkbox,
    Dropdown,
    Calc,
    File,
    Yesno,
    Truefalse,
    Slider,
    Descriptive,
    Date,
    Datetime,
}

impl FieldType {
    /// The full enumeration.
    pub const ALL: [FieldType; 13] = [
        FieldType::Text,
        FieldType::Notes,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Dropdown,
        FieldType::Calc,
        FieldType::File,
        FieldType::Yesno,
        FieldType::Truefalse,
        FieldType::Slider,
        FieldType::Descriptive,
        FieldType::Date,
        FieldType::Datetime,
    ];

    /// Canonical lowercase spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Notes => "notes",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Dropdown => "dropdown",
            FieldType::Calc => "calc",
            FieldType::File => "file",
            FieldType::Yesno => "yesno",
            FieldType::Truefalse => "truefalse",
            FieldType::Slider => "slider",
            FieldType::Descriptive => "descriptive",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
        }
    }

    /// Types whose choices column holds code/label pairs.
    pub fn is_multiple_choice(&self) -> bool {
        matches!(self, FieldType::Radio | FieldType::Checkbox | FieldType::Dropdown)
    }

    /// Types that put something in the choices column.
    pub fn uses_choices_column(&self) -> bool {
        self.is_multiple_choice() || matches!(self, FieldType::Slider | FieldType::Calc)
    }

    /// Types that may carry text validation settings.
    pub fn accepts_validation(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Date | FieldType::Datetime | FieldType::Slider
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = KilnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| KilnError::InvalidFieldType(s.to_string()))
    }
}

/// Known values for the text validation column.
pub const VALIDATION_TYPES: &[&str] = &[
    "integer",
    "number",
    "number_1dp",
    "number_2dp",
    "date_ymd",
    "date_mdy",
    "date_dmy",
    "time",
    "time_mm_ss",
    "datetime_ymd",
    "datetime_mdy",
    "datetime_dmy",
    "datetime_seconds_ymd",
    "datetime_seconds_mdy",
    "datetime_seconds_dmy",
    "email",
    "phone",
    "zipcode",
    "alpha_only",
];

/// Whether `value` is a recognised text validation type.
pub fn is_validation_type(value: &str) -> bool {
    VALIDATION_TYPES.contains(&value.trim().to_lowercase().as_str())
}

/// Whether `value` is a date validation (format) for `date` fields.
pub fn is_date_format(value: &str) -> bool {
    value.trim().to_lowercase().starts_with("date_")
}

/// Whether `value` is a date-time validation (format) for `datetime` fields.
pub fn is_datetime_format(value: &str) -> bool {
    value.trim().to_lowercase().starts_with("datetime_")
}

/// Whether bounds under this validation type must be numbers.
pub fn is_numeric_validation(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "integer" || lower.starts_with("number")
}

/// Whether `name` satisfies the REDCap variable naming rule.
pub fn is_valid_variable_name(name: &str) -> bool {
    VARIABLE_NAME_RE.is_match(name)
}

/// Best-effort conversion of arbitrary text into a legal variable name.
pub fn sanitize_variable_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut sanitized = NON_IDENTIFIER_RE.replace_all(&lower, "_").into_owned();
    if !sanitized.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
        sanitized = format!("var_{}", sanitized);
    }
    sanitized.truncate(MAX_VARIABLE_NAME_LEN);
    sanitized
}
