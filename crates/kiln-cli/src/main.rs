//! Kiln CLI - REDCap data dictionary upgrader.

mod cli;
mod commands;
mod logging;

use std::path::Path;

use clap::Parser;
use cli::{Cli, Commands};
use kiln::{KilnConfig, KilnError, exit_codes};
use logging::{LogConfig, init_logging};

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbose(cli.verbose));

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(exit_codes::FAILURE);
        }
    };

    let result = match cli.command {
        Commands::Map {
            sheets,
            output,
            threshold,
            max_header_scan,
        } => commands::map::run(sheets, output, threshold, max_header_scan, config),

        Commands::Plan {
            sheets,
            mapping,
            output,
            drop_unlabeled,
        } => commands::plan::run(sheets, mapping, output, drop_unlabeled, config),

        Commands::Apply {
            script,
            sheets,
            output,
            keep_columns,
        } => commands::apply::run(script, sheets, output, keep_columns, config),

        Commands::Lint {
            file,
            output,
            form_name,
            json,
        } => commands::lint::run(file, output, form_name, json, config),

        Commands::Infer {
            report,
            output,
            provider,
            model,
            overwrite,
        } => commands::infer::run(report, output, provider, model, overwrite, config),

        Commands::Compile {
            report,
            output,
            repair_names,
        } => commands::compile::run(report, output, repair_names, config),

        Commands::Split { file, out_dir } => commands::split::run(file, out_dir, config),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code_for(e.as_ref())
        }
    };
    std::process::exit(code);
}

fn load_config(path: Option<&Path>) -> kiln::Result<KilnConfig> {
    match path {
        Some(path) => KilnConfig::load(path),
        None => Ok(KilnConfig::default()),
    }
}

/// Library errors carry their own exit code; anything else is a failure.
fn exit_code_for(error: &(dyn std::error::Error + 'static)) -> i32 {
    error
        .downcast_ref::<KilnError>()
        .map(KilnError::exit_code)
        .unwrap_or(exit_codes::FAILURE)
}
