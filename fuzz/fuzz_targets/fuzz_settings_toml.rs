//! Fuzz target for agent.toml configuration parsing.
//!
//! Tests that TOML settings parsing handles arbitrary input without
//! panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_config::SettingsFile;

fuzz_target!(|data: &str| {
    // Try to parse as TOML - should never panic, only return an error
    let _ = toml::from_str::<SettingsFile>(data);
});
