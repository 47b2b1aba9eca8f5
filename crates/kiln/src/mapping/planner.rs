//! First-pass script generation from a workbook's header mappings.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::Workbook;
use crate::error::Result;
use crate::schema::CanonicalHeader;
use crate::transform::{Command, CommandInterpreter};

use super::record::{HeaderMapping, MappingFile};

/// Name of the combined output sheet.
pub const DEFAULT_OUTPUT_SHEET: &str = "REDCap";

/// Settings for [`StructuralPlanner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub output_sheet: String,
    /// Also drop rows whose Field Label is blank.
    pub drop_unlabeled: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            output_sheet: DEFAULT_OUTPUT_SHEET.to_string(),
            drop_unlabeled: false,
        }
    }
}

impl PlannerConfig {
    pub fn with_output_sheet(mut self, name: impl Into<String>) -> Self {
        self.output_sheet = name.into();
        self
    }

    pub fn with_drop_unlabeled(mut self, drop: bool) -> Self {
        self.drop_unlabeled = drop;
        self
    }
}

/// Turns header mappings into the structural normalization script.
///
/// Per sheet: `ProcessSheet`, a `MapColumn` for each mapped raw column,
/// `EnsureColumn` for every canonical header, `DeleteRowsIfEmpty` on the
/// identifying columns, then constant fills for every surviving row.
#[derive(Debug, Clone, Default)]
pub struct StructuralPlanner {
    config: PlannerConfig,
}

impl StructuralPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan every non-ignored sheet, in mapping file order.
    pub fn plan(&self, mappings: &MappingFile, workbook: &Workbook) -> Result<Vec<Command>> {
        let mut commands = vec![Command::CreateOutputSheet {
            name: self.config.output_sheet.clone(),
        }];
        for (sheet, mapping) in mappings.active_sheets() {
            commands.extend(self.plan_sheet(sheet, mapping, workbook)?);
        }
        Ok(commands)
    }

    /// Commands for one sheet, starting with its `ProcessSheet`.
    pub fn plan_sheet(
        &self,
        sheet: &str,
        mapping: &HeaderMapping,
        workbook: &Workbook,
    ) -> Result<Vec<Command>> {
        let raw = workbook.sheet_document(sheet, mapping.start_row)?;

        let mut commands = vec![Command::ProcessSheet {
            name: sheet.to_string(),
            start_row: mapping.start_row,
        }];
        let mut constants: Vec<(CanonicalHeader, String)> = Vec::new();

        for (canonical, entry) in &mapping.mapping {
            if entry.is_override && !raw.has_column(&entry.field_name) {
                constants.push((*canonical, entry.field_name.clone()));
            } else if entry.field_name != canonical.name() {
                commands.push(Command::MapColumn {
                    from: entry.field_name.clone(),
                    to: canonical.name().to_string(),
                });
            }
        }
        for (canonical, value) in &mapping.immediate {
            constants.push((*canonical, value.clone()));
        }

        for header in CanonicalHeader::ALL {
            commands.push(Command::EnsureColumn {
                column: header.name().to_string(),
            });
        }

        let mut identifying = vec![CanonicalHeader::VariableName];
        if self.config.drop_unlabeled {
            identifying.push(CanonicalHeader::FieldLabel);
        }
        identifying.retain(|h| !constants.iter().any(|(c, _)| c == h));
        if !identifying.is_empty() {
            commands.push(Command::DeleteRowsIfEmpty {
                columns: identifying.iter().map(|h| h.name().to_string()).collect(),
            });
        }

        let survivors = CommandInterpreter::new()
            .run_workbook(workbook, &commands)?
            .row_count();

        for (canonical, value) in &constants {
            for row in 1..=survivors {
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

        info!(
            sheet,
            rows = survivors,
            constants = constants.len(),
            commands = commands.len(),
            "sheet planned"
        );
        Ok(commands)
    }
}
