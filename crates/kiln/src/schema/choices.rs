//! Encoding of the choices column: code/label pairs and slider endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};

/// Separator between choice entries.
const ENTRY_SEPARATOR: &str = " | ";

/// A single coded answer option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub code: String,
    pub label: String,
}

impl Choice {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.code, self.label)
    }
}

/// Serialize choices as `code1,label1 | code2,label2 | ...`, order preserved.
pub fn format_choices(choices: &[Choice]) -> String {
    choices
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

/// Parse a choices cell back into code/label pairs.
///
/// Each `|`-separated entry splits on its first comma; surrounding whitespace
/// is trimmed. Empty entries, entries without a comma and empty codes are
/// rejected.
pub fn parse_choices(value: &str) -> Result<Vec<Choice>> {
    let malformed = |message: String| KilnError::MalformedChoiceString {
        value: value.to_string(),
        message,
    };

    if value.trim().is_empty() {
        return Err(malformed("no choices".to_string()));
    }

    let mut choices = Vec::new();
    for (i, entry) in value.split('|').enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(malformed(format!("entry {} is empty", i + 1)));
        }
        let (code, label) = entry
            .split_once(',')
            .ok_or_else(|| malformed(format!("entry '{}' has no code/label comma", entry)))?;
        let code = code.trim();
        if code.is_empty() {
            return Err(malformed(format!("entry '{}' has an empty code", entry)));
        }
        choices.push(Choice::new(code, label.trim()));
    }

    Ok(choices)
}

/// Codes that appear more than once, in first-repeat order.
pub fn duplicate_codes(choices: &[Choice]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for choice in choices {
        if !seen.insert(choice.code.as_str()) && !duplicates.contains(&choice.code) {
            duplicates.push(choice.code.clone());
        }
    }
    duplicates
}

/// Endpoints of a slider field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderLabels {
    pub min: String,
    pub min_label: String,
    pub max: String,
    pub max_label: String,
}

impl SliderLabels {
    /// Render as `min,minLabel | max,maxLabel`.
    pub fn format(&self) -> String {
        format!(
            "{},{}{}{},{}",
            self.min, self.min_label, ENTRY_SEPARATOR, self.max, self.max_label
        )
    }

    /// Parse a slider cell, requiring exactly two numeric endpoints.
    pub fn parse(value: &str) -> Result<Self> {
        let choices = parse_choices(value)?;
        let malformed = |message: &str| KilnError::MalformedChoiceString {
            value: value.to_string(),
            message: message.to_string(),
        };

        let [low, high] = choices.as_slice() else {
            return Err(malformed("slider needs exactly two endpoints"));
        };
        if low.code.parse::<f64>().is_err() || high.code.parse::<f64>().is_err() {
            return Err(malformed("slider endpoints must be numeric"));
        }

        Ok(Self {
            min: low.code.clone(),
            min_label: low.label.clone(),
            max: high.code.clone(),
            max_label: high.label.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_choices() {
        let choices = vec![Choice::new("1", "Yes"), Choice::new("0", "No")];
        assert_eq!(format_choices(&choices), "1,Yes | 0,No");
    }

    #[test]
    fn test_parse_choices_trims_and_keeps_order() {
        let parsed = parse_choices(" 3, Often |1,Never|2 ,Sometimes ").unwrap();
        assert_eq!(
            parsed,
            vec![
                Choice::new("3", "Often"),
                Choice::new("1", "Never"),
                Choice::new("2", "Sometimes"),
            ]
        );
    }

    #[test]
    fn test_label_may_contain_commas() {
        let parsed = parse_choices("1, Yes, definitely | 0, No").unwrap();
        assert_eq!(parsed[0].label, "Yes, definitely");
    }

    #[test]
    fn test_parse_choices_rejects_malformed() {
        assert!(parse_choices("").is_err());
        assert!(parse_choices("1,Yes | | 0,No").is_err());
        assert!(parse_choices("Yes | No").is_err());
        assert!(parse_choices(",Yes").is_err());
    }

    #[test]
    fn test_duplicate_codes() {
        let choices = parse_choices("1,A | 2,B | 1,C | 1,D").unwrap();
        assert_eq!(duplicate_codes(&choices), vec!["1".to_string()]);
    }

    #[test]
    fn test_slider_round_trip() {
        let slider = SliderLabels {
            min: "0".to_string(),
            min_label: "None".to_string(),
            max: "100".to_string(),
            max_label: "Worst".to_string(),
        };
        let cell = slider.format();
        assert_eq!(cell, "0,None | 100,Worst");
        assert_eq!(SliderLabels::parse(&cell).unwrap(), slider);
    }

    #[test]
    fn test_slider_rejects_non_numeric() {
        assert!(SliderLabels::parse("low,None | high,Worst").is_err());
        assert!(SliderLabels::parse("0,None | 50,Mid | 100,Worst").is_err());
    }
}
