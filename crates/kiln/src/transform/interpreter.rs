//! Executes command sequences against an execution context.

use tracing::{debug, info, warn};

use crate::document::{Document, Workbook};
use crate::error::{KilnError, Result};
use crate::schema::{
    CHOICES_COLUMN, CanonicalHeader, FieldType, SliderLabels, VALIDATION_TYPE_COLUMN,
    format_choices, is_valid_variable_name,
};

use super::command::Command;
use super::context::ExecutionContext;
use super::operations::{RowAudit, TransformChange, TransformResult};

/// Applies commands strictly in order, failing fast on the first error.
pub struct CommandInterpreter;

impl CommandInterpreter {
    /// Create a new interpreter.
    pub fn new() -> Self {
        Self
    }

    /// Run a sequence against a copy of `document` and return the result.
    ///
    /// The caller's document is never modified, even on failure.
    pub fn run(&self, document: &Document, commands: &[Command]) -> Result<Document> {
        let mut ctx = ExecutionContext::new(document.clone());
        self.execute(&mut ctx, commands)?;
        Ok(ctx.finish())
    }

    /// Run a sequence whose `ProcessSheet` commands read from `workbook`.
    pub fn run_workbook(&self, workbook: &Workbook, commands: &[Command]) -> Result<Document> {
        let mut ctx = ExecutionContext::with_workbook(workbook);
        self.execute(&mut ctx, commands)?;
        Ok(ctx.finish())
    }

    /// Execute commands in order, stopping at the first failure.
    ///
    /// Failures are wrapped in `KilnError::Step` naming the 1-based step and
    /// the failing command.
    pub fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        commands: &[Command],
    ) -> Result<TransformResult> {
        let mut result = TransformResult::new();

        for command in commands {
            let step = ctx.steps_run() + 1;
            debug!(step, command = command.name(), "executing");

            let change = self.apply(ctx, command).map_err(|source| KilnError::Step {
                step,
                command: command.to_string(),
                source: Box::new(source),
            })?;
            ctx.record_step();
            result.add_change(change);
        }

        info!(
            commands = result.operations_applied,
            cells = result.cells_changed,
            columns = result.columns_added,
            rows_removed = result.rows_removed,
            "command sequence complete"
        );
        Ok(result)
    }

    /// Apply a single command.
    pub fn apply(&self, ctx: &mut ExecutionContext<'_>, command: &Command) -> Result<TransformChange> {
        let mut change = TransformChange::new(command.description());

        match command {
            Command::EnsureColumn { column } => {
                ensure(ctx.target_mut(), column, &mut change);
            }
            Command::RenameColumn { old, new } => {
                if !ctx.target_mut().rename_column(old, new)? {
                    warn!(column = %old, "rename of absent column ignored");
                }
            }
            Command::MapColumn { from, to } => {
                if !ctx.target_mut().rename_column(from, to)? {
                    ensure(ctx.target_mut(), to, &mut change);
                }
                ctx.record_mapping(from, to);
            }
            Command::CreateOutputSheet { name } => ctx.create_output(name)?,
            Command::ProcessSheet { name, start_row } => ctx.process_sheet(name, *start_row)?,
            Command::DeleteRowsIfEmpty { columns } => {
                let doc = ctx.target_mut();
                for column in columns {
                    ensure(doc, column, &mut change);
                }
                let doomed = blank_rows(doc, columns)?;
                change.rows_removed = doc.remove_rows(&doomed);
            }
            Command::SetVariableName { row, variable_name } => {
                let unique = unique_name(ctx, *row, variable_name.trim())?;
                write(ctx.target_mut(), *row, CanonicalHeader::VariableName.name(), unique, command, &mut change)?;
            }
            Command::LowercaseVariableName { row } => {
                let column = CanonicalHeader::VariableName.name();
                check_row(ctx.target(), *row)?;
                let current = ctx.target().cell_or_empty(*row, column).trim().to_string();
                if !current.is_empty() {
                    let lowered = current.to_lowercase();
                    if !is_valid_variable_name(&lowered) {
                        return Err(KilnError::InvalidVariableName(current));
                    }
                    let unique = unique_name(ctx, *row, &lowered)?;
                    write(ctx.target_mut(), *row, column, unique, command, &mut change)?;
                }
            }
            Command::SetFieldType { row, field_type } => {
                let field_type: FieldType = field_type.parse()?;
                write(
                    ctx.target_mut(),
                    *row,
                    CanonicalHeader::FieldType.name(),
                    field_type.as_str().to_string(),
                    command,
                    &mut change,
                )?;
            }
            Command::SetChoices { row, choices } => {
                write(ctx.target_mut(), *row, CHOICES_COLUMN, format_choices(choices), command, &mut change)?;
            }
            Command::SetSlider {
                row,
                min,
                min_label,
                max,
                max_label,
            } => {
                let slider = SliderLabels {
                    min: min.clone(),
                    min_label: min_label.clone(),
                    max: max.clone(),
                    max_label: max_label.clone(),
                };
                write(ctx.target_mut(), *row, CHOICES_COLUMN, slider.format(), command, &mut change)?;
            }
            Command::SetFormula { row, formula } => {
                write(ctx.target_mut(), *row, CHOICES_COLUMN, formula.clone(), command, &mut change)?;
            }
            Command::SetFormat { row, format } => {
                write(ctx.target_mut(), *row, VALIDATION_TYPE_COLUMN, format.clone(), command, &mut change)?;
            }
            Command::SetValidation {
                row,
                validation_type,
                min,
                max,
            } => {
                let doc = ctx.target_mut();
                check_row(doc, *row)?;
                write(doc, *row, VALIDATION_TYPE_COLUMN, validation_type.clone(), command, &mut change)?;
                write(doc, *row, CanonicalHeader::ValidationMin.name(), min.clone(), command, &mut change)?;
                write(doc, *row, CanonicalHeader::ValidationMax.name(), max.clone(), command, &mut change)?;
            }
            Command::SetFormName { row, form_name } => {
                write(
                    ctx.target_mut(),
                    *row,
                    CanonicalHeader::FormName.name(),
                    form_name.clone(),
                    command,
                    &mut change,
                )?;
            }
            Command::ClearCell { row, column } => {
                write(ctx.target_mut(), *row, column, String::new(), command, &mut change)?;
            }
            Command::SetCell { row, column, value } => {
                write(ctx.target_mut(), *row, column, value.clone(), command, &mut change)?;
            }
        }

        Ok(change)
    }
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure(doc: &mut Document, column: &str, change: &mut TransformChange) {
    if doc.ensure_column(column) {
        change.columns_added.push(column.to_string());
    }
}

fn check_row(doc: &Document, row: usize) -> Result<()> {
    if row == 0 || row > doc.row_count() {
        return Err(KilnError::RowOutOfRange {
            row,
            rows: doc.row_count(),
        });
    }
    Ok(())
}

/// Ensure the column, then overwrite one cell, auditing real changes only.
fn write(
    doc: &mut Document,
    row: usize,
    column: &str,
    value: String,
    command: &Command,
    change: &mut TransformChange,
) -> Result<()> {
    check_row(doc, row)?;
    ensure(doc, column, change);

    let previous = doc.set_cell(row, column, value.clone())?;
    if previous != value {
        change.row_audits.push(RowAudit {
            row,
            column: column.to_string(),
            original_value: previous,
            new_value: value,
            command: command.name().to_string(),
        });
    }
    Ok(())
}

/// Rows where any of `columns` is blank, evaluated before any removal.
fn blank_rows(doc: &Document, columns: &[String]) -> Result<Vec<usize>> {
    let indices = columns
        .iter()
        .map(|c| {
            doc.column_index(c)
                .ok_or_else(|| KilnError::UnknownColumn(c.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(doc
        .rows()
        .filter(|(_, cells)| indices.iter().any(|&i| cells[i].trim().is_empty()))
        .map(|(row, _)| row)
        .collect())
}

/// First of `base`, `base_2`, `base_3`, … not used elsewhere.
fn unique_name(ctx: &ExecutionContext<'_>, row: usize, base: &str) -> Result<String> {
    check_row(ctx.target(), row)?;
    let used = ctx.used_variable_names(row);
    if !used.contains(base) {
        return Ok(base.to_string());
    }

    let mut suffix = 2;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if !used.contains(&candidate) {
            debug!(row, suffix, "variable name suffixed for uniqueness");
            return Ok(candidate);
        }
        suffix += 1;
    }
}
