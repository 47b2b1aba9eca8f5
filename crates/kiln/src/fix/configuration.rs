//! Typed view of the `configuration` object an inference attaches to a record.

use serde_json::{Map, Value};

use crate::error::{KilnError, Result};
use crate::schema::{
    Choice, FieldType, SliderLabels, is_date_format, is_datetime_format, is_validation_type,
};

/// What the inferred field type needs besides the type itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Configuration {
    /// `{}` or absent.
    Empty,
    /// `{"choices": [{"code", "label"}, ...]}`
    Choices(Vec<Choice>),
    /// `{"min", "min_label", "max", "max_label"}`
    Slider(SliderLabels),
    /// `{"formula"}`
    Formula(String),
    /// `{"format"}`
    Format(String),
    /// `{"validation_type", "min", "max"}`
    Validation {
        validation_type: String,
        min: String,
        max: String,
    },
}

impl Configuration {
    /// Parse a configuration by its shape.
    ///
    /// A bare array is read as a choice list. Choice entries may be
    /// `{"code", "label"}` objects or `[code, label]` pairs.
    pub fn from_value(value: Option<&Value>, line: usize) -> Result<Self> {
        let malformed = |message: String| KilnError::MalformedConfiguration { line, message };

        let object = match value {
            None | Some(Value::Null) => return Ok(Configuration::Empty),
            Some(Value::Array(items)) => return Ok(Configuration::Choices(choice_list(items, line)?)),
            Some(Value::Object(object)) => object,
            Some(other) => return Err(malformed(format!("expected an object, got {}", other))),
        };

        if object.is_empty() {
            return Ok(Configuration::Empty);
        }
        if let Some(choices) = object.get("choices") {
            return match choices {
                Value::Array(items) => Ok(Configuration::Choices(choice_list(items, line)?)),
                Value::String(s) => crate::schema::parse_choices(s)
                    .map(Configuration::Choices)
                    .map_err(|e| malformed(e.to_string())),
                other => Err(malformed(format!("'choices' must be a list, got {}", other))),
            };
        }
        if object.contains_key("min_label") || object.contains_key("max_label") {
            return Ok(Configuration::Slider(SliderLabels {
                min: scalar(object, "min", line)?,
                min_label: scalar(object, "min_label", line)?,
                max: scalar(object, "max", line)?,
                max_label: scalar(object, "max_label", line)?,
            }));
        }
        if object.contains_key("formula") {
            return Ok(Configuration::Formula(scalar(object, "formula", line)?));
        }
        if object.contains_key("format") {
            return Ok(Configuration::Format(scalar(object, "format", line)?));
        }
        if object.contains_key("validation_type") {
            return Ok(Configuration::Validation {
                validation_type: scalar(object, "validation_type", line)?,
                min: scalar(object, "min", line)?,
                max: scalar(object, "max", line)?,
            });
        }

        let keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        Err(malformed(format!("unrecognised configuration keys: {}", keys.join(", "))))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Configuration::Empty)
    }

    /// Check that this configuration can drive `field_type`.
    ///
    /// Choice lists given for `yesno`/`truefalse` are dropped, since REDCap
    /// fixes their codes.
    pub fn fit(self, field_type: FieldType, line: usize) -> Result<Self> {
        let mismatch = |what: &str| KilnError::MalformedConfiguration {
            line,
            message: format!("{} configuration does not fit field type '{}'", what, field_type),
        };

        match (field_type, self) {
            (t, Configuration::Choices(choices)) if t.is_multiple_choice() => {
                if choices.is_empty() {
                    Err(KilnError::MalformedConfiguration {
                        line,
                        message: format!("{} field needs at least one choice", t),
                    })
                } else {
                    Ok(Configuration::Choices(choices))
                }
            }
            (t, _) if t.is_multiple_choice() => Err(KilnError::MalformedConfiguration {
                line,
                message: format!("{} field needs a choice list", t),
            }),
            (FieldType::Yesno | FieldType::Truefalse, Configuration::Choices(_)) => {
                Ok(Configuration::Empty)
            }
            (FieldType::Slider, Configuration::Slider(labels)) => {
                let numeric = |v: &str| v.trim().parse::<f64>().is_ok();
                if numeric(&labels.min) && numeric(&labels.max) {
                    Ok(Configuration::Slider(labels))
                } else {
                    Err(KilnError::MalformedConfiguration {
                        line,
                        message: "slider endpoints must be numeric".to_string(),
                    })
                }
            }
            (FieldType::Calc, Configuration::Formula(formula)) if !formula.trim().is_empty() => {
                Ok(Configuration::Formula(formula))
            }
            (FieldType::Calc, _) => Err(KilnError::MalformedConfiguration {
                line,
                message: "calc field needs a formula".to_string(),
            }),
            (FieldType::Date | FieldType::Datetime, Configuration::Validation { validation_type, .. }) => {
                Configuration::Format(validation_type).fit(field_type, line)
            }
            (FieldType::Date, Configuration::Format(format)) if is_date_format(&format) => {
                Ok(Configuration::Format(format))
            }
            (FieldType::Datetime, Configuration::Format(format)) if is_datetime_format(&format) => {
                Ok(Configuration::Format(format))
            }
            (FieldType::Date | FieldType::Datetime, other) => Err(KilnError::MalformedConfiguration {
                line,
                message: format!("{} field needs a date format, got {:?}", field_type, other),
            }),
            (FieldType::Text, Configuration::Validation { validation_type, min, max }) => {
                if validation_type.trim().is_empty() || is_validation_type(&validation_type) {
                    Ok(Configuration::Validation {
                        validation_type,
                        min,
                        max,
                    })
                } else {
                    Err(KilnError::MalformedConfiguration {
                        line,
                        message: format!("unknown validation type '{}'", validation_type),
                    })
                }
            }
            (_, Configuration::Empty) => Ok(Configuration::Empty),
            (_, Configuration::Choices(_)) => Err(mismatch("choices")),
            (_, Configuration::Slider(_)) => Err(mismatch("slider")),
            (_, Configuration::Formula(_)) => Err(mismatch("formula")),
            (_, Configuration::Format(_)) => Err(mismatch("format")),
            (_, Configuration::Validation { .. }) => Err(mismatch("validation")),
        }
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// A string-or-number field; absent means empty.
fn scalar(object: &Map<String, Value>, key: &str, line: usize) -> Result<String> {
    match object.get(key) {
        None => Ok(String::new()),
        Some(value) => text(value).ok_or_else(|| KilnError::MalformedConfiguration {
            line,
            message: format!("'{}' must be a string or number", key),
        }),
    }
}

fn choice_list(items: &[Value], line: usize) -> Result<Vec<Choice>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let pair = match item {
                Value::Object(entry) => entry
                    .get("code")
                    .and_then(text)
                    .zip(entry.get("label").and_then(text)),
                Value::Array(pair) if pair.len() == 2 => text(&pair[0]).zip(text(&pair[1])),
                _ => None,
            };
            match pair {
                Some((code, label)) if !code.trim().is_empty() => Ok(Choice::new(code, label)),
                _ => Err(KilnError::MalformedConfiguration {
                    line,
                    message: format!("choice {} is not a code/label pair", i + 1),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Configuration> {
        Configuration::from_value(Some(&value), 7)
    }

    #[test]
    fn test_shapes() {
        assert_eq!(parse(json!({})).unwrap(), Configuration::Empty);
        assert_eq!(Configuration::from_value(None, 1).unwrap(), Configuration::Empty);
        assert_eq!(
            parse(json!({"choices": [{"code": 1, "label": "Yes"}, ["0", "No"]]})).unwrap(),
            Configuration::Choices(vec![Choice::new("1", "Yes"), Choice::new("0", "No")])
        );
        assert_eq!(
            parse(json!({"min": 0, "min_label": "None", "max": 10, "max_label": "Worst"})).unwrap(),
            Configuration::Slider(SliderLabels {
                min: "0".to_string(),
                min_label: "None".to_string(),
                max: "10".to_string(),
                max_label: "Worst".to_string(),
            })
        );
        assert_eq!(
            parse(json!({"formula": "[a] + [b]"})).unwrap(),
            Configuration::Formula("[a] + [b]".to_string())
        );
        assert_eq!(
            parse(json!({"validation_type": "integer", "min": 0})).unwrap(),
            Configuration::Validation {
                validation_type: "integer".to_string(),
                min: "0".to_string(),
                max: String::new(),
            }
        );
        assert_eq!(
            parse(json!([{"code": "a", "label": "A"}])).unwrap(),
            Configuration::Choices(vec![Choice::new("a", "A")])
        );
    }

    #[test]
    fn test_malformed_shapes() {
        for bad in [
            json!("radio"),
            json!({"colour": "blue"}),
            json!({"choices": [{"code": "1"}]}),
            json!({"choices": 3}),
            json!({"formula": ["x"]}),
        ] {
            match parse(bad) {
                Err(KilnError::MalformedConfiguration { line, .. }) => assert_eq!(line, 7),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_fit_against_type() {
        let choices = Configuration::Choices(vec![Choice::new("1", "A")]);
        assert!(choices.clone().fit(FieldType::Radio, 1).is_ok());
        assert_eq!(choices.clone().fit(FieldType::Yesno, 1).unwrap(), Configuration::Empty);
        assert!(choices.fit(FieldType::Text, 1).is_err());
        assert!(Configuration::Empty.fit(FieldType::Dropdown, 1).is_err());
        assert!(Configuration::Empty.fit(FieldType::Calc, 1).is_err());
        assert!(Configuration::Empty.fit(FieldType::Notes, 1).is_ok());

        let format = Configuration::Validation {
            validation_type: "date_dmy".to_string(),
            min: String::new(),
            max: String::new(),
        };
        assert_eq!(
            format.fit(FieldType::Date, 1).unwrap(),
            Configuration::Format("date_dmy".to_string())
        );
        assert!(Configuration::Format("date_dmy".to_string()).fit(FieldType::Datetime, 1).is_err());
    }
}
