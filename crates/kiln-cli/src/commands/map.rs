//! Map command - match raw sheet headers to canonical headers.

use std::path::PathBuf;

use colored::Colorize;
use kiln::{Kiln, KilnConfig, exit_codes};

use super::CommandResult;

pub fn run(
    sheets: Vec<PathBuf>,
    output: PathBuf,
    threshold: Option<f64>,
    max_header_scan: Option<usize>,
    mut config: KilnConfig,
) -> CommandResult {
    if let Some(threshold) = threshold {
        config.mapper = config.mapper.with_threshold(threshold);
    }
    if let Some(rows) = max_header_scan {
        config.mapper = config.mapper.with_max_header_scan(rows);
    }

    let kiln = Kiln::with_config(config);
    let (workbook, _) = kiln.read_workbook(&sheets)?;
    let mappings = kiln.map(&workbook);
    mappings.save(&output)?;

    let mut incomplete = false;
    for (sheet, mapping) in mappings.iter() {
        println!(
            "{} {} (header row {}, {} mapped)",
            "Sheet".cyan().bold(),
            sheet.white().bold(),
            mapping.start_row,
            mapping.mapping.len()
        );
        for (canonical, value) in &mapping.immediate {
            println!("  {} {} = {}", "constant".blue(), canonical, value);
        }
        for ambiguity in &mapping.ambiguities {
            println!(
                "  {} {} could be {}",
                "ambiguous".yellow(),
                ambiguity.canonical,
                ambiguity.candidates.join(" or ")
            );
        }
        if !mapping.missing_required.is_empty() {
            incomplete = true;
            println!(
                "  {} {}",
                "missing:".red().bold(),
                mapping
                    .missing_required
                    .iter()
                    .map(|h| h.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    println!();
    println!("Saved mapping to {}", output.display().to_string().cyan());
    if incomplete {
        println!(
            "{} Edit the mapping file to cover the missing headers before planning.",
            "Note:".yellow()
        );
        return Ok(exit_codes::MISSING_REQUIRED);
    }
    Ok(exit_codes::SUCCESS)
}
