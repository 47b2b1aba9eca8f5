//! Compile an augmented lint report into the second-pass repair script.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{KilnError, Result};
use crate::mapping::HeaderMapping;
use crate::schema::{
    CHOICES_COLUMN, CanonicalHeader, FieldType, format_choices, is_valid_variable_name,
    sanitize_variable_name,
};
use crate::transform::Command;
use crate::validation::{ValidationRecord, ViolationKind};

use super::configuration::Configuration;

/// Knobs for [`FixCompiler`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixOptions {
    /// Repair malformed or duplicate variable names even when no inferred
    /// name was supplied.
    pub repair_variable_names: bool,
}

impl FixOptions {
    pub fn with_repair_variable_names(mut self, repair: bool) -> Self {
        self.repair_variable_names = repair;
        self
    }
}

/// Turns inferred field types and configurations into commands.
///
/// Only rows that are invalid, or that carry an inference, produce commands,
/// and each row gets the smallest set of writes that brings it to the
/// inferred state. Column ensures come first, then row fixes in ascending
/// row order.
#[derive(Debug, Clone, Default)]
pub struct FixCompiler {
    options: FixOptions,
}

impl FixCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FixOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FixOptions {
        &self.options
    }

    /// Compile fixes for a document that already has canonical headers.
    pub fn compile(&self, records: &[ValidationRecord]) -> Result<Vec<Command>> {
        let fixes = self.row_fixes(records)?;

        let mut commands = ensure_commands(&fixes);
        commands.extend(fixes);

        info!(
            records = records.len(),
            commands = commands.len(),
            "fix script compiled"
        );
        Ok(commands)
    }

    /// Compile fixes for a raw document described by `mapping`.
    ///
    /// Mapped raw columns are renamed to their canonical names and operator
    /// constants are filled on every row before the row fixes run.
    pub fn compile_for(
        &self,
        document: &Document,
        mapping: &HeaderMapping,
        records: &[ValidationRecord],
    ) -> Result<Vec<Command>> {
        let fixes = self.row_fixes(records)?;

        let mut commands = Vec::new();
        let mut constants = Vec::new();
        for (canonical, entry) in &mapping.mapping {
            if !document.has_column(&entry.field_name) {
                if entry.is_override {
                    constants.push((*canonical, entry.field_name.clone()));
                }
                continue;
            }
            if entry.is_override || entry.field_name == canonical.name() {
                continue;
            }
            commands.push(Command::RenameColumn {
                old: entry.field_name.clone(),
                new: canonical.name().to_string(),
            });
        }

        commands.extend(ensure_commands(&fixes));

        for (canonical, value) in &constants {
            for row in 1..=document.row_count() {
                commands.push(match canonical {
                    CanonicalHeader::FormName => Command::SetFormName {
                        row,
                        form_name: value.clone(),
                    },
                    other => Command::SetCell {
                        row,
                        column: other.name().to_string(),
                        value: value.clone(),
                    },
                });
            }
        }
        commands.extend(fixes);

        info!(
            records = records.len(),
            constants = constants.len(),
            commands = commands.len(),
            "fix script compiled for raw document"
        );
        Ok(commands)
    }

    fn row_fixes(&self, records: &[ValidationRecord]) -> Result<Vec<Command>> {
        let mut ordered: Vec<&ValidationRecord> = records
            .iter()
            .filter(|r| !r.is_valid() || r.has_inference())
            .collect();
        ordered.sort_by_key(|r| r.line);

        let mut commands = Vec::new();
        for record in ordered {
            commands.extend(self.fix_record(record)?);
        }
        Ok(commands)
    }

    /// Commands for one record, in write order.
    fn fix_record(&self, record: &ValidationRecord) -> Result<Vec<Command>> {
        let row = record.line;
        let Some(inferred) = record
            .inferred_field_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        else {
            return Err(KilnError::IncompleteInference { line: row });
        };
        let field_type: FieldType =
            inferred
                .parse()
                .map_err(|_| KilnError::MalformedConfiguration {
                    line: row,
                    message: format!("inferred field type '{}' is not a REDCap type", inferred),
                })?;

        let configuration =
            Configuration::from_value(record.configuration.as_ref(), row)?.fit(field_type, row)?;

        let mut commands = Vec::new();
        if let Some(command) = self.fix_variable_name(record)? {
            commands.push(command);
        }

        if record.field_type.trim() != field_type.as_str() {
            commands.push(Command::SetFieldType {
                row,
                field_type: field_type.as_str().to_string(),
            });
        }

        // A text field inferred without validation keeps none of the old settings.
        let drops_validation = !field_type.accepts_validation()
            || (field_type == FieldType::Text && configuration == Configuration::Empty);

        let setter = configuration_command(row, record, configuration);
        let writes_choices = setter
            .as_ref()
            .is_some_and(|c| c.written_columns().contains(&CHOICES_COLUMN));
        commands.extend(setter);

        if !field_type.uses_choices_column() && !writes_choices && !record.choices.trim().is_empty() {
            commands.push(clear(row, CHOICES_COLUMN));
        }
        if drops_validation {
            for header in [
                CanonicalHeader::ValidationType,
                CanonicalHeader::ValidationMin,
                CanonicalHeader::ValidationMax,
            ] {
                if record.field(header).is_some_and(|v| !v.trim().is_empty()) {
                    commands.push(clear(row, header.name()));
                }
            }
        }

        debug!(row, field_type = field_type.as_str(), commands = commands.len(), "row fixed");
        Ok(commands)
    }

    fn fix_variable_name(&self, record: &ValidationRecord) -> Result<Option<Command>> {
        let row = record.line;
        let current = record.variable_name.trim();
        let duplicate = record
            .classification
            .errors
            .iter()
            .any(|v| v.rule == ViolationKind::DuplicateVariableName);
        if is_valid_variable_name(current) && !duplicate {
            return Ok(None);
        }

        if let Some(inferred) = record
            .inferred_variable_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            if !is_valid_variable_name(inferred) {
                return Err(KilnError::InvalidVariableName(inferred.to_string()));
            }
            return Ok(Some(Command::SetVariableName {
                row,
                variable_name: inferred.to_string(),
            }));
        }

        if !self.options.repair_variable_names {
            return Ok(None);
        }

        let command = if duplicate && is_valid_variable_name(current) {
            Command::SetVariableName {
                row,
                variable_name: current.to_string(),
            }
        } else if !current.is_empty() && is_valid_variable_name(&current.to_lowercase()) {
            Command::LowercaseVariableName { row }
        } else {
            let source = if current.is_empty() {
                record.field_label.as_str()
            } else {
                current
            };
            let repaired = sanitize_variable_name(source);
            if !is_valid_variable_name(&repaired) {
                warn!(row, name = current, "variable name could not be repaired");
                return Ok(None);
            }
            Command::SetVariableName {
                row,
                variable_name: repaired,
            }
        };
        Ok(Some(command))
    }
}

/// The setter for a fitted configuration, unless the row already holds it.
fn configuration_command(
    row: usize,
    record: &ValidationRecord,
    configuration: Configuration,
) -> Option<Command> {
    let same = |current: &str, wanted: &str| current.trim() == wanted.trim();

    match configuration {
        Configuration::Empty => None,
        Configuration::Choices(choices) => {
            (!same(&record.choices, &format_choices(&choices))).then_some(Command::SetChoices { row, choices })
        }
        Configuration::Slider(labels) => (!same(&record.choices, &labels.format())).then_some(
            Command::SetSlider {
                row,
                min: labels.min,
                min_label: labels.min_label,
                max: labels.max,
                max_label: labels.max_label,
            },
        ),
        Configuration::Formula(formula) => {
            (!same(&record.choices, &formula)).then_some(Command::SetFormula { row, formula })
        }
        Configuration::Format(format) => {
            (!same(&record.validation_type, &format)).then_some(Command::SetFormat { row, format })
        }
        Configuration::Validation {
            validation_type,
            min,
            max,
        } => {
            let unchanged = same(&record.validation_type, &validation_type)
                && same(&record.validation_min, &min)
                && same(&record.validation_max, &max);
            (!unchanged).then_some(Command::SetValidation {
                row,
                validation_type,
                min,
                max,
            })
        }
    }
}

fn clear(row: usize, column: &str) -> Command {
    Command::ClearCell {
        row,
        column: column.to_string(),
    }
}

/// One `EnsureColumn` per header the script relies on, in canonical order.
fn ensure_commands(fixes: &[Command]) -> Vec<Command> {
    let touched: Vec<&str> = fixes.iter().flat_map(|c| c.written_columns()).collect();

    let mut columns: Vec<&str> = CanonicalHeader::ALL
        .iter()
        .filter(|h| h.is_required() || **h == CanonicalHeader::SectionHeader || touched.contains(&h.name()))
        .map(|h| h.name())
        .collect();
    for column in touched {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }

    columns
        .into_iter()
        .map(|column| Command::EnsureColumn {
            column: column.to_string(),
        })
        .collect()
}
