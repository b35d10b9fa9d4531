//! Fuzz target for `dpkg -l linux-image-*` kernel comparison.
//!
//! Tests that `kernel_mismatch` handles arbitrary running-kernel strings
//! and dpkg output without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm_core::collect::reboot::kernel_mismatch;

fuzz_target!(|data: (&str, &str)| {
    let (running, dpkg_output) = data;
    let _ = kernel_mismatch(running, dpkg_output);
});
