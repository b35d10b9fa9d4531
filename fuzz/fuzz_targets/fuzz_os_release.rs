//! Fuzz target for /etc/os-release parsing.
//!
//! Tests that `parse_os_release` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::sysinfo::parse_os_release;

fuzz_target!(|data: &str| {
    let _ = parse_os_release(data);
});
