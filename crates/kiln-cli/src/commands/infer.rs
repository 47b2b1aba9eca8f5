//! Infer command - augment a lint report with inferred field types.

use std::path::PathBuf;

use colored::Colorize;
use kiln::llm::InferenceProvider;
use kiln::validation::{load_report, save_report};
use kiln::{Kiln, KilnConfig, exit_codes};

use super::CommandResult;
use crate::cli::ProviderChoice;

pub fn run(
    report: PathBuf,
    output: Option<PathBuf>,
    provider: Option<ProviderChoice>,
    model: Option<String>,
    overwrite: bool,
    mut config: KilnConfig,
) -> CommandResult {
    if let Some(provider) = provider {
        config.inference = config.inference.with_provider(match provider {
            ProviderChoice::Heuristic => InferenceProvider::Heuristic,
            ProviderChoice::Openai => InferenceProvider::OpenAi,
        });
    }
    if let Some(model) = model {
        config.inference = config.inference.with_model(model);
    }
    if overwrite {
        config.inference = config.inference.with_overwrite(true);
    }

    let kiln = Kiln::with_config(config);
    let mut records = load_report(&report)?;
    let augmented = kiln.infer(&mut records)?;

    let output = output.unwrap_or(report);
    save_report(&records, &output)?;
    println!(
        "{} {} of {} rows; saved to {}",
        "Inferred".green().bold(),
        augmented,
        records.len(),
        output.display().to_string().cyan()
    );
    Ok(exit_codes::SUCCESS)
}
