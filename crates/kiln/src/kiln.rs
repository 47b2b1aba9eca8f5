//! Main Kiln struct and public API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::{Document, Workbook};
use crate::error::{KilnError, Result};
use crate::fix::{FixCompiler, FixOptions};
use crate::input::{Parser, ParserConfig, SourceMetadata};
use crate::llm::{FieldInferrer, InferenceConfig, augment_report, inferrer_for};
use crate::mapping::{HeaderMapper, MapperConfig, MappingFile, PlannerConfig, StructuralPlanner};
use crate::persistence::{load_json, save_json};
use crate::schema::CanonicalHeader;
use crate::transform::{Command, CommandInterpreter};
use crate::validation::{LintSummary, SchemaValidator, ValidationRecord};

/// Configuration for a Kiln pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    /// Parser configuration.
    pub parser: ParserConfig,
    /// Header matching configuration.
    pub mapper: MapperConfig,
    /// Structural script configuration.
    pub planner: PlannerConfig,
    /// Which inferrer fills in invalid rows.
    pub inference: InferenceConfig,
    /// Fix compiler options.
    pub fix: FixOptions,
    /// Form name forced onto every row before linting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
}

impl KilnConfig {
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_mapper(mut self, mapper: MapperConfig) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    pub fn with_fix_options(mut self, fix: FixOptions) -> Self {
        self.fix = fix;
        self
    }

    pub fn with_form_name(mut self, form_name: impl Into<String>) -> Self {
        self.form_name = Some(form_name.into());
        self
    }

    /// Load a configuration file; absent keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path)
    }
}

/// Everything an end-to-end upgrade produced.
#[derive(Debug, Clone)]
pub struct UpgradeResult {
    /// Input files in sheet order.
    pub sources: Vec<SourceMetadata>,
    /// Header mappings per sheet.
    pub mappings: MappingFile,
    /// First-pass normalization script.
    pub structural: Vec<Command>,
    /// Second-pass repair script.
    pub fixes: Vec<Command>,
    /// The upgraded dictionary, canonical columns only.
    pub document: Document,
    /// Lint report of the upgraded dictionary.
    pub report: Vec<ValidationRecord>,
    pub summary: LintSummary,
}

impl UpgradeResult {
    /// Whether the upgraded dictionary still has invalid rows.
    pub fn has_violations(&self) -> bool {
        self.summary.has_violations()
    }
}

/// The Kiln pipeline: map, normalize, lint, infer, fix, lint again.
pub struct Kiln {
    config: KilnConfig,
    parser: Parser,
    mapper: HeaderMapper,
    planner: StructuralPlanner,
    interpreter: CommandInterpreter,
    validator: SchemaValidator,
    compiler: FixCompiler,
    inferrer: Option<Arc<dyn FieldInferrer>>,
}

impl Default for Kiln {
    fn default() -> Self {
        Self::new()
    }
}

impl Kiln {
    /// Create a new Kiln instance with default configuration.
    pub fn new() -> Self {
        Self::with_config(KilnConfig::default())
    }

    /// Create a Kiln instance with custom configuration.
    pub fn with_config(config: KilnConfig) -> Self {
        let mut validator = SchemaValidator::new();
        if let Some(form_name) = &config.form_name {
            validator = validator.with_form_name(form_name.clone());
        }

        Self {
            parser: Parser::with_config(config.parser.clone()),
            mapper: HeaderMapper::with_config(config.mapper.clone()),
            planner: StructuralPlanner::with_config(config.planner.clone()),
            interpreter: CommandInterpreter::new(),
            validator,
            compiler: FixCompiler::with_options(config.fix.clone()),
            inferrer: None,
            config,
        }
    }

    /// Use this inferrer instead of the one the configuration names.
    pub fn with_inferrer(mut self, inferrer: impl FieldInferrer + 'static) -> Self {
        self.inferrer = Some(Arc::new(inferrer));
        self
    }

    pub fn config(&self) -> &KilnConfig {
        &self.config
    }

    /// Read one delimited file per sheet.
    pub fn read_workbook(&self, paths: &[PathBuf]) -> Result<(Workbook, Vec<SourceMetadata>)> {
        self.parser.read_workbook(paths)
    }

    /// Read a dictionary whose first row is the header.
    pub fn read_document(&self, path: impl AsRef<Path>) -> Result<Document> {
        Ok(self.parser.read_document(path)?.0)
    }

    /// Map every sheet's raw headers to canonical headers.
    pub fn map(&self, workbook: &Workbook) -> MappingFile {
        self.mapper.map_workbook(workbook)
    }

    /// Generate the first-pass script, refusing sheets that miss required headers.
    pub fn plan(&self, mappings: &MappingFile, workbook: &Workbook) -> Result<Vec<Command>> {
        for (_, mapping) in mappings.active_sheets() {
            mapping.ensure_complete()?;
        }
        self.planner.plan(mappings, workbook)
    }

    /// Run a first-pass script and keep only the canonical columns.
    pub fn normalize(&self, workbook: &Workbook, commands: &[Command]) -> Result<Document> {
        let output = self.interpreter.run_workbook(workbook, commands)?;
        Ok(canonical_only(&output))
    }

    /// Run a script against a single document.
    pub fn apply(&self, document: &Document, commands: &[Command]) -> Result<Document> {
        self.interpreter.run(document, commands)
    }

    /// Lint a dictionary.
    pub fn lint(&self, document: &Document) -> Result<Vec<ValidationRecord>> {
        self.validator.check_headers(document)?;
        Ok(self.validator.validate(document))
    }

    /// Fill in inferences for invalid records.
    pub fn infer(&self, records: &mut [ValidationRecord]) -> Result<usize> {
        let overwrite = self.config.inference.overwrite;
        match &self.inferrer {
            Some(inferrer) => augment_report(inferrer.as_ref(), records, overwrite),
            None => augment_report(inferrer_for(&self.config.inference)?.as_ref(), records, overwrite),
        }
    }

    /// Compile an augmented report into the repair script.
    pub fn compile(&self, records: &[ValidationRecord]) -> Result<Vec<Command>> {
        self.compiler.compile(records)
    }

    /// Run the whole pipeline over a set of sheet files.
    pub fn upgrade(&self, paths: &[PathBuf]) -> Result<UpgradeResult> {
        let (workbook, sources) = self.read_workbook(paths)?;
        if workbook.is_empty() {
            return Err(KilnError::EmptyData("no input sheets".to_string()));
        }

        let mappings = self.map(&workbook);
        let structural = self.plan(&mappings, &workbook)?;
        let normalized = self.normalize(&workbook, &structural)?;

        let mut report = self.lint(&normalized)?;
        self.infer(&mut report)?;
        let fixes = self.compile(&report)?;
        let document = canonical_only(&self.apply(&normalized, &fixes)?);

        let report = self.lint(&document)?;
        let summary = LintSummary::from_records(&report);
        info!(
            sheets = workbook.len(),
            rows = document.row_count(),
            structural = structural.len(),
            fixes = fixes.len(),
            invalid = summary.invalid,
            "upgrade finished"
        );

        Ok(UpgradeResult {
            sources,
            mappings,
            structural,
            fixes,
            document,
            report,
            summary,
        })
    }
}

/// The canonical headers in canonical order, nothing else.
pub fn canonical_only(document: &Document) -> Document {
    let columns: Vec<&str> = CanonicalHeader::ALL.iter().map(|h| h.name()).collect();
    document.project(&columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HeuristicInferrer;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_upgrade_end_to_end() {
        let dir = TempDir::new().unwrap();
        let demographics = write(
            &dir,
            "demographics.csv",
            "Study dictionary,,,\n\
             Variable,Type,Label,Permissible Values\n\
             age,text,Age in years,\n\
             Sex,radio,Sex,\"1, Male | 2, Female\"\n\
             ,,,\n\
             smoker,Yes/No,Smoker?,\"1, Yes | 0, No\"\n",
        );
        let labs = write(
            &dir,
            "labs.csv",
            "Variable,Type,Label\nhb,number,Haemoglobin\nvisit,date,Visit date\n",
        );

        let kiln = Kiln::new().with_inferrer(HeuristicInferrer::new());
        let result = kiln.upgrade(&[demographics, labs]).unwrap();

        assert_eq!(result.mappings.len(), 2);
        assert_eq!(result.document.row_count(), 5);
        assert_eq!(
            result.document.columns().len(),
            CanonicalHeader::ALL.len()
        );
        assert!(!result.has_violations(), "{:?}", result.report);

        let names: Vec<&str> = result
            .document
            .column_values("Variable / Field Name")
            .unwrap()
            .collect();
        assert_eq!(names, vec!["age", "sex", "smoker", "hb", "visit"]);
        let forms: Vec<&str> = result.document.column_values("Form Name").unwrap().collect();
        assert_eq!(
            forms,
            vec!["demographics", "demographics", "demographics", "labs", "labs"]
        );
        assert_eq!(result.document.cell(3, "Field Type").unwrap(), "yesno");
        assert_eq!(result.document.cell(4, "Field Type").unwrap(), "text");
    }

    #[test]
    fn test_plan_refuses_missing_required() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(
            "odd",
            vec![
                vec!["Colour".to_string(), "Shape".to_string()],
                vec!["red".to_string(), "round".to_string()],
            ],
        );
        let kiln = Kiln::new();
        let mappings = kiln.map(&workbook);
        let err = kiln.plan(&mappings, &workbook).unwrap_err();
        assert!(matches!(err, KilnError::MissingRequiredHeader(_)));
    }

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kiln.json");
        let config = KilnConfig::default()
            .with_form_name("baseline")
            .with_fix_options(FixOptions::default().with_repair_variable_names(true));
        config.save(&path).unwrap();

        let loaded = KilnConfig::load(&path).unwrap();
        assert_eq!(loaded.form_name.as_deref(), Some("baseline"));
        assert!(loaded.fix.repair_variable_names);
        assert_eq!(loaded.planner, PlannerConfig::default());
    }

    #[test]
    fn test_partial_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kiln.json");
        fs::write(&path, r#"{"mapper": {"threshold": 0.9}}"#).unwrap();

        let loaded = KilnConfig::load(&path).unwrap();
        assert_eq!(loaded.mapper.threshold, 0.9);
        assert_eq!(loaded.planner.output_sheet, "REDCap");
    }
}
