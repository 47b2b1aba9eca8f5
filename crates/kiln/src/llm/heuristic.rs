//! Deterministic inference from what a row already holds.

use serde_json::{Value, json};

use crate::error::Result;
use crate::schema::{
    Choice, FieldType, SliderLabels, duplicate_codes, is_date_format, is_datetime_format,
    is_numeric_validation, is_valid_variable_name, is_validation_type, parse_choices,
    sanitize_variable_name,
};
use crate::validation::ValidationRecord;

use super::provider::{FieldInferrer, Inference};

/// Spellings seen in hand-made dictionaries.
const TYPE_ALIASES: &[(&str, FieldType)] = &[
    ("textbox", FieldType::Text),
    ("string", FieldType::Text),
    ("free text", FieldType::Text),
    ("textarea", FieldType::Notes),
    ("note", FieldType::Notes),
    ("memo", FieldType::Notes),
    ("radio button", FieldType::Radio),
    ("single choice", FieldType::Radio),
    ("checkboxes", FieldType::Checkbox),
    ("multiple choice", FieldType::Checkbox),
    ("select", FieldType::Dropdown),
    ("list", FieldType::Dropdown),
    ("calculated", FieldType::Calc),
    ("calculation", FieldType::Calc),
    ("upload", FieldType::File),
    ("yes/no", FieldType::Yesno),
    ("boolean", FieldType::Yesno),
    ("true/false", FieldType::Truefalse),
    ("visual analog scale", FieldType::Slider),
    ("vas", FieldType::Slider),
    ("header", FieldType::Descriptive),
    ("datetime_ymd", FieldType::Datetime),
    ("date_ymd", FieldType::Date),
];

/// Infers field types without any remote call.
///
/// Keeps the row's current type and configuration when they parse, reads
/// common aliases of the type names, treats two-option yes/no or true/false
/// choice lists as the dedicated types, and otherwise falls back to `text`.
#[derive(Debug, Clone, Default)]
pub struct HeuristicInferrer;

impl HeuristicInferrer {
    pub fn new() -> Self {
        Self
    }

    fn field_type(record: &ValidationRecord, choices: Option<&[Choice]>) -> FieldType {
        let raw = record.field_type.trim().to_lowercase();
        let declared = raw.parse::<FieldType>().ok().or_else(|| {
            TYPE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == raw)
                .map(|(_, t)| *t)
        });

        if let Some(choices) = choices {
            if let Some(boolean) = boolean_type(choices) {
                if declared.is_none_or(|t| t.is_multiple_choice() || t == boolean) {
                    return boolean;
                }
            }
        }

        match declared {
            Some(t) if t.is_multiple_choice() && choices.is_none() => FieldType::Text,
            Some(FieldType::Calc) if record.choices.trim().is_empty() => FieldType::Text,
            Some(t) => t,
            None if choices.is_some() => FieldType::Radio,
            None => FieldType::Text,
        }
    }

    fn configuration(record: &ValidationRecord, field_type: FieldType, choices: Option<Vec<Choice>>) -> Value {
        match field_type {
            t if t.is_multiple_choice() => match choices {
                Some(choices) => json!({ "choices": choices }),
                None => json!({}),
            },
            FieldType::Slider => match SliderLabels::parse(&record.choices) {
                Ok(labels) => json!({
                    "min": labels.min,
                    "min_label": labels.min_label,
                    "max": labels.max,
                    "max_label": labels.max_label,
                }),
                Err(_) => json!({}),
            },
            FieldType::Calc => json!({ "formula": record.choices.trim() }),
            FieldType::Date => json!({ "format": date_format(&record.validation_type, is_date_format, "date_ymd") }),
            FieldType::Datetime => json!({
                "format": date_format(&record.validation_type, is_datetime_format, "datetime_ymd")
            }),
            FieldType::Text => text_validation(record),
            _ => json!({}),
        }
    }

    fn variable_name(record: &ValidationRecord) -> Option<String> {
        let current = record.variable_name.trim();
        if is_valid_variable_name(current) {
            return None;
        }
        let source = if current.is_empty() {
            record.field_label.as_str()
        } else {
            current
        };
        if source.trim().is_empty() {
            return None;
        }
        Some(sanitize_variable_name(source)).filter(|n| is_valid_variable_name(n))
    }
}

impl FieldInferrer for HeuristicInferrer {
    fn infer(&self, record: &ValidationRecord) -> Result<Inference> {
        let choices = parse_choices(&record.choices)
            .ok()
            .filter(|c| duplicate_codes(c).is_empty());
        let field_type = Self::field_type(record, choices.as_deref());
        let configuration = Self::configuration(record, field_type, choices);

        let mut inference = Inference::new(field_type.as_str()).with_configuration(configuration);
        if let Some(name) = Self::variable_name(record) {
            inference = inference.with_variable_name(name);
        }
        Ok(inference)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// `yesno` or `truefalse` when the choice labels are exactly that pair.
fn boolean_type(choices: &[Choice]) -> Option<FieldType> {
    let [a, b] = choices else {
        return None;
    };
    let mut labels = [a.label.trim().to_lowercase(), b.label.trim().to_lowercase()];
    labels.sort();
    match (labels[0].as_str(), labels[1].as_str()) {
        ("no", "yes") => Some(FieldType::Yesno),
        ("false", "true") => Some(FieldType::Truefalse),
        _ => None,
    }
}

fn date_format(current: &str, accepts: fn(&str) -> bool, fallback: &str) -> String {
    let current = current.trim().to_lowercase();
    if accepts(&current) && is_validation_type(&current) {
        current
    } else {
        fallback.to_string()
    }
}

/// Keep a usable validation, blank out an unusable one.
fn text_validation(record: &ValidationRecord) -> Value {
    let validation_type = record.validation_type.trim().to_lowercase();
    let min = record.validation_min.trim();
    let max = record.validation_max.trim();
    if validation_type.is_empty() && min.is_empty() && max.is_empty() {
        return json!({});
    }

    let numeric = |v: &str| v.is_empty() || v.parse::<f64>().is_ok();
    let usable = is_validation_type(&validation_type)
        && (!is_numeric_validation(&validation_type) || (numeric(min) && numeric(max)));
    if usable {
        json!({ "validation_type": validation_type, "min": min, "max": max })
    } else {
        json!({ "validation_type": "", "min": "", "max": "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::FixCompiler;
    use crate::llm::augment_report;
    use crate::transform::CommandInterpreter;
    use crate::validation::SchemaValidator;
    use crate::Document;

    fn record(field_type: &str, choices: &str) -> ValidationRecord {
        ValidationRecord {
            line: 1,
            variable_name: "q1".to_string(),
            field_type: field_type.to_string(),
            field_label: "Question".to_string(),
            choices: choices.to_string(),
            ..ValidationRecord::default()
        }
    }

    fn infer(record: &ValidationRecord) -> Inference {
        HeuristicInferrer::new().infer(record).unwrap()
    }

    #[test]
    fn test_keeps_parseable_choices() {
        let inference = infer(&record("dropdown", "1, Red | 2, Blue"));
        assert_eq!(inference.field_type, "dropdown");
        assert_eq!(
            inference.configuration,
            json!({"choices": [{"code": "1", "label": "Red"}, {"code": "2", "label": "Blue"}]})
        );
    }

    #[test]
    fn test_yes_no_labels() {
        assert_eq!(infer(&record("radio", "1, Yes | 0, No")).field_type, "yesno");
        assert_eq!(infer(&record("", "1, True | 0, False")).field_type, "truefalse");
        // An explicit non-choice type is respected.
        assert_eq!(infer(&record("notes", "1, Yes | 0, No")).field_type, "notes");
    }

    #[test]
    fn test_aliases_and_fallback() {
        assert_eq!(infer(&record("Yes/No", "")).field_type, "yesno");
        assert_eq!(infer(&record("textarea", "")).field_type, "notes");
        assert_eq!(infer(&record("mystery", "")).field_type, "text");
        assert_eq!(infer(&record("radio", "")).field_type, "text");
        assert_eq!(infer(&record("mystery", "a, A | b, B")).field_type, "radio");
    }

    #[test]
    fn test_date_gets_default_format() {
        let inference = infer(&record("date", ""));
        assert_eq!(inference.configuration, json!({"format": "date_ymd"}));

        let mut dmy = record("date", "");
        dmy.validation_type = "date_dmy".to_string();
        assert_eq!(infer(&dmy).configuration, json!({"format": "date_dmy"}));
    }

    #[test]
    fn test_bad_validation_blanked() {
        let mut r = record("text", "");
        r.validation_type = "integer".to_string();
        r.validation_min = "zero".to_string();
        assert_eq!(
            infer(&r).configuration,
            json!({"validation_type": "", "min": "", "max": ""})
        );
    }

    #[test]
    fn test_variable_name_suggestion() {
        let mut r = record("text", "");
        r.variable_name = "Body Weight".to_string();
        assert_eq!(infer(&r).variable_name.as_deref(), Some("body_weight"));
        assert!(infer(&record("text", "")).variable_name.is_none());
    }

    #[test]
    fn test_heuristic_round_trip_repairs_dictionary() {
        let doc = Document::from_rows(
            ["Variable / Field Name", "Form Name", "Field Type", "Field Label",
             "Choices, Calculations, OR Slider Labels", "Text Validation Type OR Show Slider Number"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![
                vec!["smoker", "demo", "radio", "Smoker?", "1, Yes | 0, No", ""],
                vec!["dob", "demo", "date", "Date of birth", "", ""],
                vec!["Comment", "demo", "memo", "Comments", "", ""],
                vec!["colour", "demo", "dropdown", "Colour", "", ""],
            ]
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect(),
        );

        let validator = SchemaValidator::new();
        let mut report = validator.validate(&doc);
        augment_report(&HeuristicInferrer::new(), &mut report, false).unwrap();
        let commands = FixCompiler::new().compile(&report).unwrap();
        let fixed = CommandInterpreter::new().run(&doc, &commands).unwrap();

        let after = validator.validate(&fixed);
        assert!(after.iter().all(|r| r.is_valid()), "{:?}", after);
        assert_eq!(fixed.cell(3, "Variable / Field Name").unwrap(), "comment");
        assert_eq!(fixed.cell(4, "Field Type").unwrap(), "text");
    }
}
