//! Validator and header mapper performance benchmarks.
//!
//! Measures lint throughput over synthetic dictionaries and header matching
//! over synthetic sheets.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kiln::{Document, HeaderMapper, SchemaValidator};

/// Canonical columns the synthetic dictionaries carry.
const COLUMNS: &[&str] = &[
    "Variable / Field Name",
    "Form Name",
    "Field Type",
    "Field Label",
    "Choices, Calculations, OR Slider Labels",
    "Text Validation Type OR Show Slider Number",
    "Text Validation Min",
    "Text Validation Max",
];

/// Generate a dictionary with a mix of valid and invalid rows.
fn generate_dictionary(rows: usize) -> Document {
    let data = (0..rows)
        .map(|i| {
            let (field_type, choices, validation, min, max) = match i % 6 {
                0 => ("text", "", "integer", "0", "120"),
                1 => ("radio", "1,Yes | 0,No", "", "", ""),
                2 => ("dropdown", "", "", "", ""),
                3 => ("date", "", "date_ymd", "", ""),
                4 => ("calc", "[v_0] + 1", "", "", ""),
                _ => ("bogus", "", "", "", ""),
            };
            let name = if i % 50 == 7 { format!("V {}", i) } else { format!("v_{}", i) };
            vec![
                name,
                format!("form_{}", i / 100),
                field_type.to_string(),
                format!("Question {}", i),
                choices.to_string(),
                validation.to_string(),
                min.to_string(),
                max.to_string(),
            ]
        })
        .collect();

    Document::from_rows(COLUMNS.iter().map(|c| c.to_string()).collect(), data)
}

/// Generate a raw sheet with messy headers and a title row.
fn generate_sheet(rows: usize) -> Vec<Vec<String>> {
    let mut grid = vec![
        vec!["Study data dictionary".to_string()],
        ["Var", "CRF", "Data type", "Question", "Permissible values", "Notes"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    ];
    for i in 0..rows {
        grid.push(vec![
            format!("v_{}", i),
            "baseline".to_string(),
            if i % 2 == 0 { "text" } else { "radio" }.to_string(),
            format!("Question number {}", i),
            if i % 2 == 0 { String::new() } else { "1,Yes | 0,No".to_string() },
            String::new(),
        ]);
    }
    grid
}

/// Benchmark linting dictionaries of various sizes.
fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let validator = SchemaValidator::new();

    for rows in [100, 1_000, 10_000].iter() {
        let document = generate_dictionary(*rows);
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &document, |b, document| {
            b.iter(|| black_box(validator.validate(document)))
        });
    }

    group.finish();
}

/// Benchmark header detection and matching.
fn bench_map_sheet(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_sheet");
    let mapper = HeaderMapper::new();

    for rows in [20, 200, 2_000].iter() {
        let grid = generate_sheet(*rows);
        group.bench_with_input(BenchmarkId::new("rows", rows), &grid, |b, grid| {
            b.iter(|| black_box(mapper.map_sheet("baseline", grid)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validate, bench_map_sheet);
criterion_main!(benches);
