//! Fuzz target for `dnf check-update` output parsing.
//!
//! Tests that `parse_check_update` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::dnf::parse_check_update;

fuzz_target!(|data: &str| {
    let _ = parse_check_update(data);
});
