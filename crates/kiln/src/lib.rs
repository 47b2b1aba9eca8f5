//! Kiln: upgrade loosely structured spreadsheets into importable REDCap data
//! dictionaries.
//!
//! Kiln maps raw column headers onto the canonical REDCap headers, rewrites
//! the sheets with a small replayable command language, lints the result and
//! compiles inferred field types back into repair commands.
//!
//! # Core Principles
//!
//! - **Replayable**: every change is a command in a plain-text script
//! - **Non-destructive**: input files are never modified
//! - **Minimal repairs**: only rows that need fixing get commands
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use kiln::Kiln;
//!
//! let kiln = Kiln::new();
//! let result = kiln.upgrade(&[PathBuf::from("demographics.csv")]).unwrap();
//!
//! println!("Rows: {}", result.document.row_count());
//! println!("Invalid rows: {}", result.summary.invalid);
//! ```

pub mod document;
pub mod error;
pub mod fix;
pub mod input;
pub mod llm;
pub mod mapping;
pub mod persistence;
pub mod schema;
pub mod transform;
pub mod validation;

mod kiln;

pub use crate::kiln::{Kiln, KilnConfig, UpgradeResult, canonical_only};
pub use document::{Document, FormSplit, Workbook, split_by_form};
pub use error::{KilnError, Result, exit_codes};
pub use fix::{FixCompiler, FixOptions};
pub use input::{Parser, ParserConfig};
pub use llm::{FieldInferrer, HeuristicInferrer, Inference, OpenAiInferrer, augment_report};
pub use mapping::{HeaderMapper, HeaderMapping, MapperConfig, MappingFile, StructuralPlanner};
pub use schema::{CanonicalHeader, FieldType};
pub use transform::{Command, CommandInterpreter, parse_script, render_script};
pub use validation::{LintSummary, SchemaValidator, ValidationRecord};
