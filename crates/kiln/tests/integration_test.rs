//! Integration tests for Kiln.

use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

use kiln::schema::Choice;
use kiln::transform::ExecutionContext;
use kiln::validation::{ViolationKind, load_report, save_report};
use kiln::{
    Command, CommandInterpreter, Document, FixCompiler, HeaderMapper, KilnError, MappingFile,
    Parser, SchemaValidator, exit_codes, parse_script, render_script, split_by_form,
};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

const CANONICAL: &[&str] = &[
    "Variable / Field Name",
    "Form Name",
    "Section Header",
    "Field Type",
    "Field Label",
    "Choices, Calculations, OR Slider Labels",
];

/// A canonical dictionary from rows of (name, form, type, label, choices).
fn dictionary(rows: &[[&str; 5]]) -> Document {
    Document::from_rows(
        strings(CANONICAL),
        rows.iter()
            .map(|[name, form, field_type, label, choices]| {
                strings(&[name, form, "", field_type, label, choices])
            })
            .collect(),
    )
}

// =============================================================================
// Interpreter Scenarios
// =============================================================================

fn age_document() -> Document {
    Document::from_rows(
        strings(&["VarRaw", "Label"]),
        vec![strings(&["age", "Age in years"])],
    )
}

fn rename_ensure_and_set() -> Vec<Command> {
    vec![
        Command::RenameColumn {
            old: "VarRaw".to_string(),
            new: "Variable / Field Name".to_string(),
        },
        Command::EnsureColumn {
            column: "Form Name".to_string(),
        },
        Command::SetFormName {
            row: 1,
            form_name: "baseline".to_string(),
        },
        Command::SetFieldType {
            row: 1,
            field_type: "text".to_string(),
        },
    ]
}

#[test]
fn test_rename_ensure_and_set_scenario() {
    let result = CommandInterpreter::new()
        .run(&age_document(), &rename_ensure_and_set())
        .expect("Run failed");

    assert_eq!(result.row_count(), 1);
    assert_eq!(result.cell(1, "Variable / Field Name").unwrap(), "age");
    assert_eq!(result.cell(1, "Form Name").unwrap(), "baseline");
    assert_eq!(result.cell(1, "Field Type").unwrap(), "text");
    assert_eq!(result.cell(1, "Label").unwrap(), "Age in years");
    assert!(!result.has_column("VarRaw"));
}

#[test]
fn test_label_rename_completes_canonical_row() {
    let mut commands = rename_ensure_and_set();
    commands.insert(
        1,
        Command::RenameColumn {
            old: "Label".to_string(),
            new: "Field Label".to_string(),
        },
    );

    let result = CommandInterpreter::new()
        .run(&age_document(), &commands)
        .expect("Run failed");

    assert_eq!(result.cell(1, "Field Label").unwrap(), "Age in years");
    assert!(!result.has_column("Label"));
    assert!(SchemaValidator::new().check_headers(&result).is_ok());
    assert!(SchemaValidator::new().validate(&result)[0].is_valid());
}

#[test]
fn test_colliding_variable_names_scenario() {
    let document = Document::from_rows(
        strings(&["Variable / Field Name"]),
        vec![strings(&[""]), strings(&[""])],
    );
    let commands = vec![
        Command::SetVariableName {
            row: 1,
            variable_name: "age".to_string(),
        },
        Command::SetVariableName {
            row: 2,
            variable_name: "age".to_string(),
        },
    ];

    let result = CommandInterpreter::new().run(&document, &commands).unwrap();
    let names: Vec<&str> = result.column_values("Variable / Field Name").unwrap().collect();
    assert_eq!(names, vec!["age", "age_2"]);
}

#[test]
fn test_delete_rows_if_empty_scenario() {
    let document = Document::from_rows(
        strings(&["Variable / Field Name", "Field Label"]),
        vec![
            strings(&["a", "First"]),
            strings(&["b", "  "]),
            strings(&["c", "Third"]),
        ],
    );
    let commands = vec![Command::DeleteRowsIfEmpty {
        columns: strings(&["Variable / Field Name", "Field Label"]),
    }];

    let result = CommandInterpreter::new().run(&document, &commands).unwrap();
    let names: Vec<&str> = result.column_values("Variable / Field Name").unwrap().collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn test_invalid_field_type_leaves_document_unchanged() {
    let document = Document::from_rows(
        strings(&["Variable / Field Name", "Field Type"]),
        vec![strings(&["age", "text"])],
    );
    let interpreter = CommandInterpreter::new();
    let mut ctx = ExecutionContext::new(document.clone());

    let err = interpreter
        .execute(
            &mut ctx,
            &[Command::SetFieldType {
                row: 1,
                field_type: "bogus".to_string(),
            }],
        )
        .unwrap_err();

    assert!(matches!(err.root(), KilnError::InvalidFieldType(_)));
    assert_eq!(err.exit_code(), exit_codes::INTERPRETATION_ERROR);
    assert_eq!(ctx.target(), &document);
}

#[test]
fn test_fail_fast_stops_remaining_commands() {
    let document = Document::from_rows(strings(&["Form Name"]), vec![strings(&[""])]);
    let mut ctx = ExecutionContext::new(document);

    let err = CommandInterpreter::new()
        .execute(
            &mut ctx,
            &[
                Command::SetFormName {
                    row: 1,
                    form_name: "baseline".to_string(),
                },
                Command::SetFormName {
                    row: 5,
                    form_name: "late".to_string(),
                },
                Command::EnsureColumn {
                    column: "Never".to_string(),
                },
            ],
        )
        .unwrap_err();

    match &err {
        KilnError::Step { step, .. } => assert_eq!(*step, 2),
        other => panic!("expected a step error, got {other:?}"),
    }
    assert!(matches!(err.root(), KilnError::RowOutOfRange { row: 5, rows: 1 }));
    assert!(!ctx.target().has_column("Never"));
}

// =============================================================================
// Script Files
// =============================================================================

#[test]
fn test_script_file_runs_in_file_order() {
    let script = create_test_file(
        "# structural pass\n\
         RenameColumn(\"Var\", \"Variable / Field Name\")\n\
         \n\
         EnsureColumn(\"Choices, Calculations, OR Slider Labels\")\n\
         SetFieldType(1, radio)\n\
         SetChoices(1, [(\"1\", \"Yes\"), (\"0\", \"No\")])\n",
    );
    let text = std::fs::read_to_string(script.path()).unwrap();
    let commands = parse_script(&text).expect("Parse failed");
    assert_eq!(commands.len(), 4);

    let document = Document::from_rows(
        strings(&["Var", "Field Type"]),
        vec![strings(&["smoker", "text"])],
    );
    let result = CommandInterpreter::new().run(&document, &commands).unwrap();

    assert_eq!(result.cell(1, "Field Type").unwrap(), "radio");
    assert_eq!(
        result.cell(1, "Choices, Calculations, OR Slider Labels").unwrap(),
        "1,Yes | 0,No"
    );

    let reparsed = parse_script(&render_script(&commands)).unwrap();
    assert_eq!(reparsed, commands);
}

#[test]
fn test_script_syntax_error_names_line() {
    let err = parse_script("EnsureColumn(\"a\")\n\nSetFieldType(x, text)\n").unwrap_err();
    match err {
        KilnError::ScriptSyntax { line, .. } => assert_eq!(line, 3),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

// =============================================================================
// Mapping
// =============================================================================

#[test]
fn test_mapping_file_round_trip() {
    let file = create_test_file(
        "Data dictionary v2,,\n\
         Variable,CRF,Field Type,Question\n\
         age,baseline,text,Age\n",
    );
    let (grid, _) = Parser::new().read_grid(file.path()).unwrap();
    let mapping = HeaderMapper::new().map_sheet("baseline", &grid);
    assert_eq!(mapping.start_row, 2);
    assert!(mapping.missing_required.is_empty(), "{:?}", mapping);

    let mut mappings = MappingFile::new();
    mappings.insert("baseline", mapping.clone());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mapping.json");
    mappings.save(&path).unwrap();
    let loaded = MappingFile::load(&path).unwrap();

    assert_eq!(loaded.get("baseline"), Some(&mapping));
}

#[test]
fn test_missing_required_is_data_not_error() {
    let document = Document::from_rows(
        strings(&["Colour", "Shape"]),
        vec![strings(&["red", "round"])],
    );
    let mapping = HeaderMapper::new().map_document(&document);

    assert!(!mapping.missing_required.is_empty());
    let err = mapping.ensure_complete().unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::MISSING_REQUIRED);
}

// =============================================================================
// Lint, Augment, Compile
// =============================================================================

#[test]
fn test_externally_augmented_report_compiles_to_valid_dictionary() {
    let document = dictionary(&[
        ["age", "baseline", "text", "Age", ""],
        ["colour", "baseline", "select", "Colour", "1, Red | 2, Blue"],
    ]);
    let validator = SchemaValidator::new();
    let records = validator.validate(&document);
    assert!(records[0].is_valid());
    assert!(!records[1].is_valid());
    assert!(records[1]
        .classification
        .errors
        .iter()
        .any(|v| v.rule == ViolationKind::UnknownFieldType));

    // The inference collaborator edits the saved report by hand.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.json");
    save_report(&records, &path).unwrap();
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json[1]["inferred_field_type"] = "dropdown".into();
    json[1]["configuration"] = serde_json::json!({
        "choices": [{"code": "1", "label": "Red"}, {"code": "2", "label": "Blue"}]
    });
    std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let augmented = load_report(&path).unwrap();
    let fixes = FixCompiler::new().compile(&augmented).unwrap();

    assert!(fixes.contains(&Command::SetFieldType {
        row: 2,
        field_type: "dropdown".to_string(),
    }));
    assert!(fixes.contains(&Command::SetChoices {
        row: 2,
        choices: vec![Choice::new("1", "Red"), Choice::new("2", "Blue")],
    }));
    assert!(fixes.iter().all(|c| c.row() != Some(1)));

    let fixed = CommandInterpreter::new().run(&document, &fixes).unwrap();
    assert!(validator.validate(&fixed).iter().all(|r| r.is_valid()));
    assert_eq!(
        fixed.cell(2, "Choices, Calculations, OR Slider Labels").unwrap(),
        "1,Red | 2,Blue"
    );
}

#[test]
fn test_compile_without_inference_is_incomplete() {
    let document = dictionary(&[["q1", "baseline", "bogus", "Question", ""]]);
    let records = SchemaValidator::new().validate(&document);

    let err = FixCompiler::new().compile(&records).unwrap_err();
    assert!(matches!(err, KilnError::IncompleteInference { line: 1 }));
    assert_eq!(err.exit_code(), exit_codes::INCOMPLETE_INFERENCE);
}

// =============================================================================
// Files In, Files Out
// =============================================================================

#[test]
fn test_dictionary_write_read_and_split() {
    let document = dictionary(&[
        ["age", "Baseline Visit", "text", "Age", ""],
        ["hb", "Labs", "text", "Haemoglobin", ""],
        ["note", "", "descriptive", "Orphan", ""],
        ["sex", "Baseline Visit", "radio", "Sex", "1,Male | 2,Female"],
    ]);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("dictionary.csv");
    kiln::input::write_document(&document, &path).unwrap();

    let (read_back, metadata) = Parser::new().read_document(&path).unwrap();
    assert_eq!(metadata.format, "csv");
    assert_eq!(read_back, document);

    let split = split_by_form(&read_back).unwrap();
    let forms: Vec<&str> = split.forms.keys().map(|s| s.as_str()).collect();
    assert_eq!(forms, vec!["Baseline Visit", "Labs"]);
    assert_eq!(split.blank_rows, 1);
    assert_eq!(split.forms["Baseline Visit"].row_count(), 2);
    assert_eq!(kiln::document::form_slug("Baseline Visit"), "baseline-visit");
}

#[test]
fn test_tsv_dictionary_detected() {
    let file = create_test_file(
        "Variable / Field Name\tForm Name\tField Type\tField Label\n\
         age\tbaseline\ttext\tAge\n",
    );
    let (document, metadata) = Parser::new().read_document(file.path()).unwrap();

    assert_eq!(metadata.format, "tsv");
    assert!(SchemaValidator::new().check_headers(&document).is_ok());
    assert!(SchemaValidator::new().validate(&document)[0].is_valid());
}
