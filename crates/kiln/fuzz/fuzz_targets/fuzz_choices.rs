//! Fuzz target for the choices column codec.

#![no_main]

use libfuzzer_sys::fuzz_target;
use kiln::schema::{SliderLabels, format_choices, parse_choices};

fuzz_target!(|data: &str| {
    if let Ok(choices) = parse_choices(data) {
        let again = parse_choices(&format_choices(&choices)).expect("formatted choices parse");
        assert_eq!(again.len(), choices.len());
    }
    let _ = SliderLabels::parse(data);
});
