//! Fuzz target: `Pattern::parse`
//!
//! Arbitrary definition strings against every backend family: parsing must
//! reject garbage with an error, never a panic, and accepted patterns must
//! satisfy the repository invariants.
//!
//! cargo fuzz run fuzz_pattern_parse

#![no_main]

use blinkd::patterns::{BackendFamily, Pattern};
use libfuzzer_sys::fuzz_target;

const FAMILIES: [BackendFamily; 6] = [
    BackendFamily::DirectMono,
    BackendFamily::EngineMonoA,
    BackendFamily::EngineMonoB,
    BackendFamily::EngineRgbA,
    BackendFamily::EngineRgbB,
    BackendFamily::RgbShim,
];

fuzz_target!(|data: &[u8]| {
    let Ok(definition) = core::str::from_utf8(data) else { return };
    for family in FAMILIES {
        if let Ok(p) = Pattern::parse("Fuzzed", definition, family) {
            assert!(!p.active && !p.undecided);
            assert!(p.engine1_mux & p.engine2_mux == 0);
            assert!(p.channels.iter().all(|c| c.len() <= 64));
        }
    }
});
