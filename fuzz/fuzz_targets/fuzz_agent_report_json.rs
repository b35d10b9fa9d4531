//! Fuzz target for agent report wire-payload parsing.
//!
//! Tests that JSON report deserialization handles arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_common::AgentReport;

fuzz_target!(|data: &[u8]| {
    // Try to parse as JSON - should never panic, only return an error
    let _ = serde_json::from_slice::<AgentReport>(data);
});
