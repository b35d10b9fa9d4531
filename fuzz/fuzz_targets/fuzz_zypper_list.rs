//! Fuzz target for `zypper list-updates` output parsing.
//!
//! Tests that `parse_list_updates` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::zypper::parse_list_updates;

fuzz_target!(|data: &str| {
    let _ = parse_list_updates(data);
});
