//! Fuzz target for `pacman -Qu` output parsing.
//!
//! Tests that `parse_upgrades` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::pacman::parse_upgrades;

fuzz_target!(|data: &str| {
    let _ = parse_upgrades(data);
});
