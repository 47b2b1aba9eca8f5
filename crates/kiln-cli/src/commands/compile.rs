//! Compile command - turn an augmented report into a repair script.

use std::path::PathBuf;

use colored::Colorize;
use kiln::persistence::write_text;
use kiln::validation::load_report;
use kiln::{Kiln, KilnConfig, exit_codes, render_script};

use super::CommandResult;

pub fn run(report: PathBuf, output: PathBuf, repair_names: bool, mut config: KilnConfig) -> CommandResult {
    if repair_names {
        config.fix = config.fix.with_repair_variable_names(true);
    }

    let kiln = Kiln::with_config(config);
    let records = load_report(&report)?;
    let commands = kiln.compile(&records)?;
    write_text(&output, &render_script(&commands))?;

    let rows = records
        .iter()
        .filter(|r| !r.is_valid() || r.has_inference())
        .count();
    println!(
        "{} {} commands for {} row(s) to {}",
        "Wrote".green().bold(),
        commands.len(),
        rows,
        output.display().to_string().cyan()
    );
    Ok(exit_codes::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln::KilnError;
    use kiln::validation::{Classification, ValidationRecord, save_report};
    use tempfile::TempDir;

    fn invalid_record() -> ValidationRecord {
        ValidationRecord {
            line: 1,
            classification: Classification {
                valid: false,
                errors: Vec::new(),
            },
            variable_name: "age".to_string(),
            field_type: "number".to_string(),
            ..ValidationRecord::default()
        }
    }

    #[test]
    fn test_missing_inference_maps_to_exit_code() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.json");
        save_report(&[invalid_record()], &report).unwrap();

        let err = run(report, dir.path().join("fixes.kiln"), false, KilnConfig::default()).unwrap_err();
        let err = err.downcast_ref::<KilnError>().unwrap();
        assert_eq!(err.exit_code(), exit_codes::INCOMPLETE_INFERENCE);
    }

    #[test]
    fn test_writes_script() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.json");
        let output = dir.path().join("fixes.kiln");
        let mut record = invalid_record();
        record.inferred_field_type = Some("text".to_string());
        save_report(&[record], &report).unwrap();

        let code = run(report, output.clone(), false, KilnConfig::default()).unwrap();
        assert_eq!(code, exit_codes::SUCCESS);

        let script = std::fs::read_to_string(&output).unwrap();
        let commands = kiln::parse_script(&script).unwrap();
        assert!(commands.contains(&kiln::Command::SetFieldType {
            row: 1,
            field_type: "text".to_string(),
        }));
    }
}
