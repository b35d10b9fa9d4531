//! Fuzz target for `apt list --upgradable` output parsing.
//!
//! Tests that `parse_upgradable` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::apt::parse_upgradable;

fuzz_target!(|data: &str| {
    // The parser should never panic, only skip malformed lines
    let _ = parse_upgradable(data);
});
