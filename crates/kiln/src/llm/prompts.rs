//! Prompt templates for LLM interactions.

use crate::schema::{FieldType, VALIDATION_TYPES};
use crate::validation::ValidationRecord;

/// System prompt shared by every inference request.
pub fn system_prompt() -> &'static str {
    "You are an expert REDCap data manager. You repair rows of REDCap data \
     dictionaries so they can be imported without errors. You always answer \
     with a single JSON object and nothing else."
}

/// Build a prompt asking for the field type and configuration of one row.
pub fn field_inference_prompt(record: &ValidationRecord) -> String {
    let problems = if record.classification.errors.is_empty() {
        "  - none reported".to_string()
    } else {
        record
            .classification
            .errors
            .iter()
            .map(|v| format!("  - {}: {}", v.rule.label(), v.message))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let types = FieldType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Repair this row of a REDCap data dictionary.

## Row {line}
- Variable / Field Name: "{name}"
- Form Name: "{form}"
- Field Type: "{field_type}"
- Field Label: "{label}"
- Choices, Calculations, OR Slider Labels: "{choices}"
- Text Validation Type OR Show Slider Number: "{validation}"
- Text Validation Min: "{min}"
- Text Validation Max: "{max}"

## Problems
{problems}

## Rules
- field_type must be one of: {types}
- radio, checkbox and dropdown need "configuration": {{"choices": [{{"code": "1", "label": "..."}}]}}
- slider may use {{"min": 0, "min_label": "...", "max": 100, "max_label": "..."}}
- calc needs {{"formula": "..."}}
- date and datetime need {{"format": "date_ymd"}} (or another date_/datetime_ format)
- text may use {{"validation_type": "...", "min": "...", "max": "..."}} with validation_type one of: {validations}
- every other case uses {{}}
- if the variable name is malformed, add "variable_name": lowercase letters, digits and underscores, starting with a letter, at most 26 characters

Respond with a JSON object:
{{
  "field_type": "text",
  "configuration": {{}},
  "variable_name": null
}}"#,
        line = record.line,
        name = record.variable_name,
        form = record.form_name,
        field_type = record.field_type,
        label = record.field_label,
        choices = record.choices,
        validation = record.validation_type,
        min = record.validation_min,
        max = record.validation_max,
        problems = problems,
        types = types,
        validations = VALIDATION_TYPES.join(", "),
    )
}
