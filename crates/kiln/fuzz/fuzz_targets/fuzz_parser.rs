//! Fuzz target for the delimited file reader.
//!
//! This fuzzer tests that the CSV/TSV reader and the header mapper:
//! 1. Never panic on malformed input
//! 2. Handle all delimiter combinations
//! 3. Cope with ragged and headerless grids

#![no_main]

use libfuzzer_sys::fuzz_target;
use kiln::{HeaderMapper, Parser};
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let parser = Parser::new();
            if let Ok((grid, _)) = parser.read_grid(temp_file.path()) {
                let mapping = HeaderMapper::new().map_sheet("fuzz", &grid);
                assert!(mapping.start_row >= 1);
            }
        }
    }
});
