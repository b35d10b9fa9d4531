//! Fuzz target for `dnf updateinfo list security` output parsing.
//!
//! Tests that `parse_security_list` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::dnf::parse_security_list;

fuzz_target!(|data: &str| {
    let _ = parse_security_list(data);
});
