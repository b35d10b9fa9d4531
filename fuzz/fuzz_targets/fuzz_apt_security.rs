//! Fuzz target for `apt-get --just-print upgrade` output parsing.
//!
//! Tests that `parse_security_packages` handles arbitrary input without
//! panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::apt::parse_security_packages;

fuzz_target!(|data: &str| {
    let _ = parse_security_packages(data);
});
