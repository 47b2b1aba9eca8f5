//! Plan command - generate the structural normalization script.

use std::path::PathBuf;

use colored::Colorize;
use kiln::persistence::write_text;
use kiln::{Kiln, KilnConfig, MappingFile, exit_codes, render_script};

use super::CommandResult;

pub fn run(
    sheets: Vec<PathBuf>,
    mapping: PathBuf,
    output: PathBuf,
    drop_unlabeled: bool,
    mut config: KilnConfig,
) -> CommandResult {
    if drop_unlabeled {
        config.planner = config.planner.with_drop_unlabeled(true);
    }

    let kiln = Kiln::with_config(config);
    let mappings = MappingFile::load(&mapping)?;
    let (workbook, _) = kiln.read_workbook(&sheets)?;

    let commands = kiln.plan(&mappings, &workbook)?;
    write_text(&output, &render_script(&commands))?;

    println!(
        "{} {} commands for {} sheet(s) to {}",
        "Wrote".green().bold(),
        commands.len(),
        mappings.active_sheets().count(),
        output.display().to_string().cyan()
    );
    Ok(exit_codes::SUCCESS)
}
