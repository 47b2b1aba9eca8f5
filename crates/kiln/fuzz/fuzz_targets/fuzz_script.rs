//! Fuzz target for the command script parser and interpreter.
//!
//! Any text must either fail to parse or run to an `Ok`/`Err` result on a
//! small dictionary without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use kiln::{CommandInterpreter, Document, parse_script, render_script};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 10_000 {
        return;
    }

    let Ok(commands) = parse_script(text) else {
        return;
    };

    let _ = parse_script(&render_script(&commands));

    let document = Document::from_rows(
        vec!["Variable / Field Name".to_string(), "Field Label".to_string()],
        vec![
            vec!["age".to_string(), "Age".to_string()],
            vec![String::new(), "Blank".to_string()],
        ],
    );
    let _ = CommandInterpreter::new().run(&document, &commands);
});
