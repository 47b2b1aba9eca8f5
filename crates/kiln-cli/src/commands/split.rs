//! Split command - write one dictionary per form.

use std::path::PathBuf;

use colored::Colorize;
use kiln::document::form_slug;
use kiln::input::write_document;
use kiln::{Kiln, KilnConfig, exit_codes, split_by_form};

use super::CommandResult;

pub fn run(file: PathBuf, out_dir: PathBuf, config: KilnConfig) -> CommandResult {
    let kiln = Kiln::with_config(config);
    let document = kiln.read_document(&file)?;
    let split = split_by_form(&document)?;

    for (form, rows) in &split.forms {
        let path = out_dir.join(format!("{}.csv", form_slug(form)));
        write_document(rows, &path)?;
        println!(
            "  {:<30} {:>5} rows  {}",
            form.white().bold(),
            rows.row_count(),
            path.display().to_string().dimmed()
        );
    }

    println!(
        "{} {} form(s) into {}",
        "Split".green().bold(),
        split.forms.len(),
        out_dir.display().to_string().cyan()
    );
    if split.blank_rows > 0 {
        println!(
            "{} {} row(s) had no form name and were skipped",
            "Warning:".yellow().bold(),
            split.blank_rows
        );
    }
    Ok(exit_codes::SUCCESS)
}
