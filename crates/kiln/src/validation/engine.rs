//! The lint engine: one record per row, every rule evaluated independently.

use tracing::{debug, info};

use crate::document::Document;
use crate::error::{KilnError, Result};
use crate::schema::CanonicalHeader;

use super::record::{LintSummary, ValidationRecord};
use super::rules::{
    ChoicesRule, FieldTypeRule, RequiredFieldsRule, Rule, ValidationColumnsRule, VariableNameRule,
};

/// Classifies every row of a canonical dictionary.
pub struct SchemaValidator {
    rules: Vec<Box<dyn Rule>>,
    form_name: Option<String>,
}

impl SchemaValidator {
    /// Create a validator with all default rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredFieldsRule),
                Box::new(VariableNameRule),
                Box::new(FieldTypeRule),
                Box::new(ChoicesRule),
                Box::new(ValidationColumnsRule),
            ],
            form_name: None,
        }
    }

    /// Lint every row as if its Form Name were `form_name`.
    pub fn with_form_name(mut self, form_name: impl Into<String>) -> Self {
        self.form_name = Some(form_name.into());
        self
    }

    /// Add a rule after the defaults.
    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Fail with `MissingRequiredHeader` if a required column is absent.
    ///
    /// A Form Name override satisfies the Form Name requirement.
    pub fn check_headers(&self, document: &Document) -> Result<()> {
        let missing: Vec<String> = CanonicalHeader::REQUIRED
            .iter()
            .filter(|h| !document.has_column(h.name()))
            .filter(|h| !(**h == CanonicalHeader::FormName && self.form_name.is_some()))
            .map(|h| h.name().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(KilnError::MissingRequiredHeader(missing))
        }
    }

    /// Produce exactly one record per row, in row order.
    pub fn validate(&self, document: &Document) -> Vec<ValidationRecord> {
        let records = (1..=document.row_count())
            .map(|row| {
                let mut record = ValidationRecord::from_row(document, row);
                if let Some(form_name) = &self.form_name {
                    record.form_name = form_name.clone();
                }
                record
            })
            .collect();
        self.classify(records)
    }

    /// Re-run every rule over existing records, replacing their classification.
    ///
    /// Inference fields are left untouched.
    pub fn classify(&self, mut records: Vec<ValidationRecord>) -> Vec<ValidationRecord> {
        for record in &mut records {
            record.classification.errors.clear();
        }

        for rule in &self.rules {
            let findings = rule.check(&records);
            debug!(rule = rule.name(), findings = findings.len(), "rule evaluated");
            for (index, violation) in findings {
                if let Some(record) = records.get_mut(index) {
                    record.classification.errors.push(violation);
                }
            }
        }

        for record in &mut records {
            record.classification.valid = record.classification.errors.is_empty();
        }

        let summary = LintSummary::from_records(&records);
        info!(
            rows = summary.total,
            valid = summary.valid,
            invalid = summary.invalid,
            "lint complete"
        );
        records
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ViolationKind;

    fn dictionary(rows: &[&[&str]]) -> Document {
        Document::from_rows(
            vec![
                "Variable / Field Name".to_string(),
                "Form Name".to_string(),
                "Field Type".to_string(),
                "Field Label".to_string(),
                "Choices, Calculations, OR Slider Labels".to_string(),
            ],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_one_record_per_row() {
        let doc = dictionary(&[
            &["age", "baseline", "text", "Age", ""],
            &["sex", "baseline", "radio", "Sex", ""],
            &["", "", "", "", ""],
        ]);
        let records = SchemaValidator::new().validate(&doc);

        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().map(|r| r.line).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(records[0].is_valid());
        assert!(!records[1].is_valid());
        assert_eq!(records[2].classification.errors.len(), 4);
    }

    #[test]
    fn test_violations_accumulate_across_rules() {
        let doc = dictionary(&[&["Bad Name", "baseline", "radio", "", ""]]);
        let records = SchemaValidator::new().validate(&doc);
        let rules: Vec<ViolationKind> = records[0]
            .classification
            .errors
            .iter()
            .map(|v| v.rule)
            .collect();

        assert_eq!(
            rules,
            vec![
                ViolationKind::MissingRequiredField,
                ViolationKind::InvalidVariableName,
                ViolationKind::MissingChoices,
            ]
        );
    }

    #[test]
    fn test_form_name_override() {
        let doc = dictionary(&[&["age", "", "text", "Age", ""]]);
        let validator = SchemaValidator::new().with_form_name("intake");
        let records = validator.validate(&doc);

        assert!(records[0].is_valid());
        assert_eq!(records[0].form_name, "intake");
    }

    #[test]
    fn test_check_headers() {
        let doc = Document::from_rows(vec!["Variable / Field Name".to_string()], vec![]);
        match SchemaValidator::new().check_headers(&doc) {
            Err(KilnError::MissingRequiredHeader(missing)) => {
                assert_eq!(missing, vec!["Form Name", "Field Type", "Field Label"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let validator = SchemaValidator::new().with_form_name("x");
        match validator.check_headers(&doc) {
            Err(KilnError::MissingRequiredHeader(missing)) => assert_eq!(missing.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_keeps_inference() {
        let doc = dictionary(&[&["sex", "baseline", "radio", "Sex", ""]]);
        let validator = SchemaValidator::new();
        let mut records = validator.validate(&doc);
        records[0].inferred_field_type = Some("radio".to_string());

        let again = validator.classify(records);
        assert!(!again[0].is_valid());
        assert_eq!(again[0].classification.errors.len(), 1);
        assert_eq!(again[0].inferred_field_type.as_deref(), Some("radio"));
    }
}
