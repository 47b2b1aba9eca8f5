//! Lint engine for canonical dictionaries.

mod engine;
mod record;
mod rules;

pub use engine::SchemaValidator;
pub use record::{
    Classification, LintSummary, ValidationRecord, Violation, ViolationKind, load_report,
    merge_reports, save_report,
};
pub use rules::{
    ChoicesRule, FieldTypeRule, RequiredFieldsRule, Rule, ValidationColumnsRule, VariableNameRule,
};
