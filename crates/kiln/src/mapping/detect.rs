//! Content-based column scoring.
//!
//! Each canonical header has a scorer that looks at the non-blank values of a
//! raw column and returns how much they look like that header's content, in
//! `0.0..=1.0`.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::{CanonicalHeader, FieldType, is_valid_variable_name, is_validation_type};

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex"));
static QUESTION_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*[a-z]?$").expect("valid regex"));
static BRANCHING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]+\]").expect("valid regex"));

const FLAGS: &[&str] = &["y", "n", "yes", "no", "true", "false"];
const ALIGNMENTS: &[&str] = &["l", "c", "r", "lv", "lh", "rv", "rh", "left", "center", "right"];

/// Minimum characters for a value to count as a long note.
const LONG_NOTE_LEN: usize = 20;

/// Fraction of `values` satisfying `predicate`.
fn ratio(values: &[&str], predicate: impl Fn(&str) -> bool) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|&&v| predicate(v)).count();
    hits as f64 / values.len() as f64
}

fn distinct_ratio(values: &[&str]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<&str> = values.iter().copied().collect();
    distinct.len() as f64 / values.len() as f64
}

fn has_whitespace(value: &str) -> bool {
    value.chars().any(char::is_whitespace)
}

/// Score how well a column's values fit `header`.
///
/// `raw_name` is the column's own header; only the Field Label scorer uses it.
pub fn content_score(header: CanonicalHeader, raw_name: &str, values: &[&str]) -> f64 {
    let values: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return 0.0;
    }

    let score = match header {
        CanonicalHeader::VariableName => {
            0.5 * ratio(&values, is_valid_variable_name) + 0.5 * distinct_ratio(&values)
        }
        CanonicalHeader::FormName => {
            0.7 * ratio(&values, is_valid_variable_name) + 0.3 * (1.0 - distinct_ratio(&values))
        }
        CanonicalHeader::FieldType => ratio(&values, |v| v.parse::<FieldType>().is_ok()),
        CanonicalHeader::FieldLabel => {
            let bonus = if raw_name.to_lowercase().contains("label") {
                0.25
            } else {
                0.0
            };
            ratio(&values, has_whitespace) + bonus
        }
        CanonicalHeader::SectionHeader => ratio(&values, has_whitespace),
        CanonicalHeader::Choices => ratio(&values, |v| v.contains('|')),
        CanonicalHeader::FieldNote => ratio(&values, |v| v.chars().count() > LONG_NOTE_LEN),
        CanonicalHeader::ValidationType => {
            ratio(&values, |v| is_validation_type(&v.to_lowercase()))
        }
        CanonicalHeader::ValidationMin | CanonicalHeader::ValidationMax => {
            ratio(&values, |v| NUMBER.is_match(v))
        }
        CanonicalHeader::Identifier | CanonicalHeader::RequiredField => {
            ratio(&values, |v| FLAGS.contains(&v.to_lowercase().as_str()))
        }
        CanonicalHeader::BranchingLogic => ratio(&values, |v| BRANCHING.is_match(v)),
        CanonicalHeader::CustomAlignment => {
            ratio(&values, |v| ALIGNMENTS.contains(&v.to_lowercase().as_str()))
        }
        CanonicalHeader::QuestionNumber => {
            ratio(&values, |v| QUESTION_NUMBER.is_match(&v.to_lowercase()))
        }
        CanonicalHeader::FieldAnnotation => ratio(&values, |v| v.starts_with('@')),
    };

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_columns_score_zero() {
        for header in CanonicalHeader::ALL {
            assert_eq!(content_score(header, "x", &["", "  "]), 0.0);
        }
    }

    #[test]
    fn test_variable_names_vs_form_names() {
        let vars = ["age", "sex", "bmi", "height"];
        let forms = ["baseline", "baseline", "baseline", "followup"];

        assert_eq!(content_score(CanonicalHeader::VariableName, "c", &vars), 1.0);
        let form_score = content_score(CanonicalHeader::FormName, "c", &forms);
        assert!(form_score > content_score(CanonicalHeader::FormName, "c", &vars));
        assert!(form_score > 0.8);
    }

    #[test]
    fn test_field_type_membership() {
        let score = content_score(CanonicalHeader::FieldType, "c", &["text", "Radio", "memo", "yesno"]);
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_label_bonus_is_capped() {
        let labels = ["Age in years", "Sex at birth"];
        assert_eq!(content_score(CanonicalHeader::FieldLabel, "Item Label", &labels), 1.0);
        assert_eq!(content_score(CanonicalHeader::FieldLabel, "Text", &labels), 1.0);
        assert_eq!(content_score(CanonicalHeader::FieldLabel, "Label", &["age"]), 0.25);
    }

    #[test]
    fn test_specialised_scorers() {
        assert_eq!(content_score(CanonicalHeader::Choices, "c", &["1, Yes | 0, No"]), 1.0);
        assert_eq!(content_score(CanonicalHeader::ValidationMin, "c", &["0", "-1.5", "x"]), 2.0 / 3.0);
        assert_eq!(content_score(CanonicalHeader::Identifier, "c", &["Y", "n"]), 1.0);
        assert_eq!(content_score(CanonicalHeader::BranchingLogic, "c", &["[sex] = '1'"]), 1.0);
        assert_eq!(content_score(CanonicalHeader::CustomAlignment, "c", &["LH", "RV"]), 1.0);
        assert_eq!(content_score(CanonicalHeader::QuestionNumber, "c", &["1", "2.3", "4a"]), 1.0);
        assert_eq!(content_score(CanonicalHeader::FieldAnnotation, "c", &["@HIDDEN", "x"]), 0.5);
        assert_eq!(content_score(CanonicalHeader::ValidationType, "c", &["Integer", "date_ymd"]), 1.0);
    }
}
