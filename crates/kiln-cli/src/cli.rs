//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Kiln: upgrade spreadsheets into importable REDCap data dictionaries
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Map raw sheet headers to canonical REDCap headers
    Map {
        /// One delimited file per sheet; the sheet is named after the file
        #[arg(value_name = "SHEET", required = true)]
        sheets: Vec<PathBuf>,

        /// Output path for the mapping file
        #[arg(short, long, default_value = "mapping.json")]
        output: PathBuf,

        /// Minimum fuzzy score for a match (0.0-1.0)
        #[arg(long)]
        threshold: Option<f64>,

        /// Number of leading rows searched for the header row
        #[arg(long)]
        max_header_scan: Option<usize>,
    },

    /// Generate the structural normalization script from a mapping file
    Plan {
        /// The sheets the mapping file describes
        #[arg(value_name = "SHEET", required = true)]
        sheets: Vec<PathBuf>,

        /// Mapping file produced by `kiln map`
        #[arg(short, long, default_value = "mapping.json")]
        mapping: PathBuf,

        /// Output path for the script
        #[arg(short, long, default_value = "structure.kiln")]
        output: PathBuf,

        /// Also delete rows whose Field Label is blank
        #[arg(long)]
        drop_unlabeled: bool,
    },

    /// Run a command script
    Apply {
        /// Script to run
        #[arg(short, long, value_name = "SCRIPT")]
        script: PathBuf,

        /// Input sheets, or a single dictionary for a repair script
        #[arg(value_name = "SHEET", required = true)]
        sheets: Vec<PathBuf>,

        /// Output path for the resulting dictionary (CSV)
        #[arg(short, long, default_value = "dictionary.csv")]
        output: PathBuf,

        /// Keep non-canonical columns in the output
        #[arg(long)]
        keep_columns: bool,
    },

    /// Validate a dictionary and write the lint report
    Lint {
        /// Dictionary to validate (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path for the report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Treat every row as belonging to this form
        #[arg(long)]
        form_name: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fill in inferred field types for invalid report rows
    Infer {
        /// Lint report to augment
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// Output path (default: overwrite the report)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Inference provider
        #[arg(long, value_enum)]
        provider: Option<ProviderChoice>,

        /// Model to use for remote providers (e.g., "gpt-4o")
        #[arg(long)]
        model: Option<String>,

        /// Re-infer rows that already carry an inference
        #[arg(long)]
        overwrite: bool,
    },

    /// Compile an augmented report into a repair script
    Compile {
        /// Augmented lint report
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// Output path for the script
        #[arg(short, long, default_value = "fixes.kiln")]
        output: PathBuf,

        /// Repair malformed variable names without an inferred name
        #[arg(long)]
        repair_names: bool,
    },

    /// Split a dictionary into one file per form
    Split {
        /// Dictionary to split
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory for the per-form files
        #[arg(short, long, default_value = "forms")]
        out_dir: PathBuf,
    },
}

/// Inference provider selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProviderChoice {
    /// Offline rules over the row's own cells
    Heuristic,
    /// OpenAI GPT models (requires OPENAI_API_KEY)
    Openai,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_lint() {
        let cli = Cli::try_parse_from(["kiln", "lint", "dict.csv", "--form-name", "baseline", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Lint { file, form_name, .. } => {
                assert_eq!(file, PathBuf::from("dict.csv"));
                assert_eq!(form_name.as_deref(), Some("baseline"));
            }
            _ => panic!("expected lint"),
        }
    }
}
