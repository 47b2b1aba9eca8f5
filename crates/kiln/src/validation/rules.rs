//! Schema rules applied to every row of a dictionary.

use std::collections::HashSet;

use crate::schema::{
    FieldType, SliderLabels, duplicate_codes, is_date_format, is_datetime_format,
    is_numeric_validation, is_valid_variable_name, is_validation_type, parse_choices,
};

use super::record::{ValidationRecord, Violation, ViolationKind};

/// A schema rule.
///
/// Rules see every record so cross-row checks (such as duplicate names) fit
/// the same shape as per-row ones. Each finding names the record's index.
pub trait Rule {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Check all records and return `(record index, violation)` pairs.
    fn check(&self, records: &[ValidationRecord]) -> Vec<(usize, Violation)>;
}

fn parsed_type(record: &ValidationRecord) -> Option<FieldType> {
    record.field_type.parse().ok()
}

/// Required fields must be non-blank.
pub struct RequiredFieldsRule;

impl Rule for RequiredFieldsRule {
    fn name(&self) -> &'static str {
        "required_fields"
    }

    fn check(&self, records: &[ValidationRecord]) -> Vec<(usize, Violation)> {
        let mut findings = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let fields = [
                ("Variable / Field Name", &record.variable_name),
                ("Form Name", &record.form_name),
                ("Field Type", &record.field_type),
                ("Field Label", &record.field_label),
            ];
            for (header, value) in fields {
                if value.trim().is_empty() {
                    findings.push((
                        i,
                        Violation::new(
                            ViolationKind::MissingRequiredField,
                            format!("missing {}", header),
                        ),
                    ));
                }
            }
        }
        findings
    }
}

/// Variable names must match the naming rule and be unique.
pub struct VariableNameRule;

impl Rule for VariableNameRule {
    fn name(&self) -> &'static str {
        "variable_name"
    }

    fn check(&self, records: &[ValidationRecord]) -> Vec<(usize, Violation)> {
        let mut findings = Vec::new();
        let mut seen = HashSet::new();

        for (i, record) in records.iter().enumerate() {
            let name = record.variable_name.trim();
            if name.is_empty() {
                continue;
            }
            if !is_valid_variable_name(name) {
                findings.push((
                    i,
                    Violation::new(
                        ViolationKind::InvalidVariableName,
                        format!("invalid variable name '{}'", name),
                    ),
                ));
            } else if !seen.insert(name) {
                findings.push((
                    i,
                    Violation::new(
                        ViolationKind::DuplicateVariableName,
                        format!("duplicate variable name '{}'", name),
                    ),
                ));
            }
        }
        findings
    }
}

/// Field types must belong to the enumeration.
pub struct FieldTypeRule;

impl Rule for FieldTypeRule {
    fn name(&self) -> &'static str {
        "field_type"
    }

    fn check(&self, records: &[ValidationRecord]) -> Vec<(usize, Violation)> {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.field_type.trim().is_empty() && parsed_type(r).is_none())
            .map(|(i, r)| {
                (
                    i,
                    Violation::new(
                        ViolationKind::UnknownFieldType,
                        format!("unknown field type '{}'", r.field_type.trim()),
                    ),
                )
            })
            .collect()
    }
}

/// The choices column must fit the field type.
pub struct ChoicesRule;

impl ChoicesRule {
    fn check_record(record: &ValidationRecord) -> Vec<Violation> {
        let Some(field_type) = parsed_type(record) else {
            return Vec::new();
        };
        let choices = record.choices.trim();

        if field_type.is_multiple_choice() {
            if choices.is_empty() {
                return vec![Violation::new(
                    ViolationKind::MissingChoices,
                    format!("{} field has no choices", field_type),
                )];
            }
            return match parse_choices(choices) {
                Ok(parsed) => duplicate_codes(&parsed)
                    .into_iter()
                    .map(|code| {
                        Violation::new(
                            ViolationKind::DuplicateChoiceCode,
                            format!("choice code '{}' appears more than once", code),
                        )
                    })
                    .collect(),
                Err(e) => vec![Violation::new(ViolationKind::MalformedChoices, e.to_string())],
            };
        }

        match field_type {
            FieldType::Slider if !choices.is_empty() => match SliderLabels::parse(choices) {
                Ok(_) => Vec::new(),
                Err(e) => vec![Violation::new(ViolationKind::MalformedSlider, e.to_string())],
            },
            FieldType::Slider => Vec::new(),
            FieldType::Calc if choices.is_empty() => vec![Violation::new(
                ViolationKind::MissingFormula,
                "calc field has no calculation",
            )],
            FieldType::Calc => Vec::new(),
            other if !choices.is_empty() => vec![Violation::new(
                ViolationKind::UnexpectedChoices,
                format!("{} field must not carry choices", other),
            )],
            _ => Vec::new(),
        }
    }
}

impl Rule for ChoicesRule {
    fn name(&self) -> &'static str {
        "choices"
    }

    fn check(&self, records: &[ValidationRecord]) -> Vec<(usize, Violation)> {
        records
            .iter()
            .enumerate()
            .flat_map(|(i, r)| Self::check_record(r).into_iter().map(move |v| (i, v)))
            .collect()
    }
}

/// Validation type, min and max must be coherent with each other and the type.
pub struct ValidationColumnsRule;

impl ValidationColumnsRule {
    fn check_record(record: &ValidationRecord) -> Vec<Violation> {
        let mut violations = Vec::new();
        let validation = record.validation_type.trim();
        let min = record.validation_min.trim();
        let max = record.validation_max.trim();
        let field_type = parsed_type(record);

        match field_type {
            Some(FieldType::Date) if !is_date_format(validation) => {
                violations.push(Violation::new(
                    ViolationKind::MissingDateFormat,
                    "date field needs a date_* validation format",
                ));
            }
            Some(FieldType::Datetime) if !is_datetime_format(validation) => {
                violations.push(Violation::new(
                    ViolationKind::MissingDateFormat,
                    "datetime field needs a datetime_* validation format",
                ));
            }
            Some(FieldType::Text) if !validation.is_empty() && !is_validation_type(validation) => {
                violations.push(Violation::new(
                    ViolationKind::UnknownValidationType,
                    format!("unknown validation type '{}'", validation),
                ));
            }
            Some(t) if !t.accepts_validation() && !validation.is_empty() => {
                violations.push(Violation::new(
                    ViolationKind::ValidationNotAllowed,
                    format!("{} field cannot carry validation '{}'", t, validation),
                ));
            }
            _ => {}
        }

        if validation.is_empty() && (!min.is_empty() || !max.is_empty()) {
            violations.push(Violation::new(
                ViolationKind::IncompleteValidation,
                "validation min/max given without a validation type",
            ));
        }

        if is_numeric_validation(validation) {
            for (label, bound) in [("min", min), ("max", max)] {
                if !bound.is_empty() && bound.parse::<f64>().is_err() {
                    violations.push(Violation::new(
                        ViolationKind::NonNumericBound,
                        format!("validation {} '{}' is not a number", label, bound),
                    ));
                }
            }
        }

        violations
    }
}

impl Rule for ValidationColumnsRule {
    fn name(&self) -> &'static str {
        "validation_columns"
    }

    fn check(&self, records: &[ValidationRecord]) -> Vec<(usize, Violation)> {
        records
            .iter()
            .enumerate()
            .flat_map(|(i, r)| Self::check_record(r).into_iter().map(move |v| (i, v)))
            .collect()
    }
}
