//! Fuzz target: control-pipe line parser.
//!
//! cargo fuzz run fuzz_control_line

#![no_main]

use blinkd::adapters::control::parse_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = core::str::from_utf8(data) else { return };
    let _ = parse_line(line);
});
