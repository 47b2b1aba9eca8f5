//! Error types for the Kiln library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Kiln operations.
#[derive(Debug, Error)]
pub enum KilnError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty file or no data to work on.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error (missing credentials, bad provider response).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A column was read before it exists.
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    /// A row address outside the current row sequence.
    #[error("Row {row} is out of range (document has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    /// A rename target is already taken by another column.
    #[error("Cannot rename '{from}' to '{to}': a column named '{to}' already exists")]
    NameCollision { from: String, to: String },

    /// A field type outside the REDCap enumeration.
    #[error("Invalid field type '{0}'")]
    InvalidFieldType(String),

    /// A variable name that violates the REDCap naming rule.
    #[error("Invalid variable name '{0}'")]
    InvalidVariableName(String),

    /// A choices string that does not parse into code/label pairs.
    #[error("Malformed choice string '{value}': {message}")]
    MalformedChoiceString { value: String, message: String },

    /// A required canonical header is absent.
    #[error("Missing required header(s): {}", .0.join(", "))]
    MissingRequiredHeader(Vec<String>),

    /// Two raw headers scored equally for one canonical header.
    #[error("Ambiguous mapping for '{canonical}': {}", .candidates.join(", "))]
    AmbiguousMapping {
        canonical: String,
        candidates: Vec<String>,
    },

    /// A row needs fixing but carries no inferred field type.
    #[error("Line {line} has no inferred field type")]
    IncompleteInference { line: usize },

    /// An inferred configuration whose shape does not fit its field type.
    #[error("Malformed configuration on line {line}: {message}")]
    MalformedConfiguration { line: usize, message: String },

    /// `ProcessSheet` named a sheet the workbook does not contain.
    #[error("Unknown sheet '{0}'")]
    UnknownSheet(String),

    /// A command issued where the script structure forbids it.
    #[error("Script order error: {0}")]
    ScriptOrder(String),

    /// A script line that does not parse.
    #[error("Syntax error on line {line}: {message}")]
    ScriptSyntax { line: usize, message: String },

    /// A command failed while a script was executing.
    #[error("Step {step} `{command}` failed: {source}")]
    Step {
        step: usize,
        command: String,
        #[source]
        source: Box<KilnError>,
    },
}

impl KilnError {
    /// The underlying error kind, unwrapping interpreter step context.
    pub fn root(&self) -> &KilnError {
        match self {
            KilnError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error came out of the command interpreter.
    pub fn is_interpretation_error(&self) -> bool {
        matches!(
            self.root(),
            KilnError::UnknownColumn(_)
                | KilnError::RowOutOfRange { .. }
                | KilnError::NameCollision { .. }
                | KilnError::InvalidFieldType(_)
                | KilnError::InvalidVariableName(_)
                | KilnError::UnknownSheet(_)
                | KilnError::ScriptOrder(_)
                | KilnError::ScriptSyntax { .. }
        )
    }

    /// Stable process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.root() {
            KilnError::IncompleteInference { .. } | KilnError::MalformedConfiguration { .. } => {
                exit_codes::INCOMPLETE_INFERENCE
            }
            KilnError::MissingRequiredHeader(_) => exit_codes::MISSING_REQUIRED,
            _ if self.is_interpretation_error() => exit_codes::INTERPRETATION_ERROR,
            _ => exit_codes::FAILURE,
        }
    }
}

/// Exit codes shared with command-line wrappers.
pub mod exit_codes {
    /// Everything succeeded and no violations remain.
    pub const SUCCESS: i32 = 0;
    /// I/O, parse or configuration failure.
    pub const FAILURE: i32 = 1;
    /// Lint found at least one invalid row.
    pub const VIOLATIONS: i32 = 2;
    /// A command script aborted.
    pub const INTERPRETATION_ERROR: i32 = 3;
    /// A fix was requested for a row without a usable inference.
    pub const INCOMPLETE_INFERENCE: i32 = 4;
    /// A dictionary lacks required canonical headers.
    pub const MISSING_REQUIRED: i32 = 5;
}

/// Result type alias for Kiln operations.
pub type Result<T> = std::result::Result<T, KilnError>;
