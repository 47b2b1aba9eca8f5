//! Lint command - validate a dictionary and write the report.

use std::path::PathBuf;

use colored::Colorize;
use kiln::validation::save_report;
use kiln::{Kiln, KilnConfig, LintSummary, exit_codes};

use super::CommandResult;

/// Invalid rows listed before the output is truncated.
const MAX_LISTED: usize = 20;

pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    form_name: Option<String>,
    json_output: bool,
    mut config: KilnConfig,
) -> CommandResult {
    if form_name.is_some() {
        config.form_name = form_name;
    }
    let kiln = Kiln::with_config(config);
    let document = kiln.read_document(&file)?;
    let report = kiln.lint(&document)?;
    let summary = LintSummary::from_records(&report);

    let output = output.unwrap_or_else(|| {
        let stem = file.file_stem().unwrap_or_default().to_string_lossy();
        file.with_file_name(format!("{}.report.json", stem))
    });
    save_report(&report, &output)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} {}: {} rows, {} valid, {} invalid",
            "Linted".cyan().bold(),
            file.display().to_string().white(),
            summary.total,
            summary.valid.to_string().green(),
            if summary.invalid > 0 {
                summary.invalid.to_string().red().bold()
            } else {
                summary.invalid.to_string().green()
            }
        );
        for (rule, count) in &summary.by_rule {
            println!("  {:<28} {}", rule.label(), count.to_string().yellow());
        }

        let invalid: Vec<_> = report.iter().filter(|r| !r.is_valid()).collect();
        if !invalid.is_empty() {
            println!();
        }
        for record in invalid.iter().take(MAX_LISTED) {
            let reasons: Vec<String> = record
                .classification
                .errors
                .iter()
                .map(|v| v.to_string())
                .collect();
            println!(
                "  {} {:<26} {}",
                format!("row {:>4}", record.line).dimmed(),
                record.variable_name,
                reasons.join("; ")
            );
        }
        if invalid.len() > MAX_LISTED {
            println!("  ... and {} more", invalid.len() - MAX_LISTED);
        }
        println!();
        println!("Saved report to {}", output.display().to_string().cyan());
    }

    Ok(if summary.has_violations() {
        exit_codes::VIOLATIONS
    } else {
        exit_codes::SUCCESS
    })
}
