//! Fuzz target: `KeyFile::parse`
//!
//! Drives arbitrary text through the keyfile parser and asserts it never
//! panics and that lookups on the result stay well-behaved.
//!
//! cargo fuzz run fuzz_keyfile

#![no_main]

use libfuzzer_sys::fuzz_target;
use blinkd::config::KeyFile;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else { return };
    let keyfile = KeyFile::parse(text);

    // Lookups over arbitrary parses must not panic either.
    let _ = keyfile.get("LED", "Backend");
    let _ = keyfile.get_list("LED", "RequiredPatterns");
    let _ = keyfile.has_section("");
});
