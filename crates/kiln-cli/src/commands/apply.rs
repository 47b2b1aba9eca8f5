//! Apply command - run a command script and export the dictionary.

use std::path::PathBuf;

use colored::Colorize;
use kiln::input::write_document;
use kiln::persistence::read_text;
use kiln::{Command, CommandInterpreter, Kiln, KilnConfig, canonical_only, exit_codes, parse_script};

use super::CommandResult;

pub fn run(
    script: PathBuf,
    sheets: Vec<PathBuf>,
    output: PathBuf,
    keep_columns: bool,
    config: KilnConfig,
) -> CommandResult {
    let kiln = Kiln::with_config(config);
    let commands = parse_script(&read_text(&script)?)?;

    // Scripts that build an output sheet read whole workbooks; repair
    // scripts edit one dictionary in place.
    let builds_output = matches!(commands.first(), Some(Command::CreateOutputSheet { .. }));
    let document = if builds_output {
        let (workbook, _) = kiln.read_workbook(&sheets)?;
        CommandInterpreter::new().run_workbook(&workbook, &commands)?
    } else {
        let [file] = sheets.as_slice() else {
            return Err("a script without CreateOutputSheet takes exactly one dictionary".into());
        };
        kiln.apply(&kiln.read_document(file)?, &commands)?
    };
    let document = if keep_columns {
        document
    } else {
        canonical_only(&document)
    };

    write_document(&document, &output)?;
    println!(
        "{} {} commands; wrote {} rows to {}",
        "Applied".green().bold(),
        commands.len(),
        document.row_count(),
        output.display().to_string().cyan()
    );
    Ok(exit_codes::SUCCESS)
}
