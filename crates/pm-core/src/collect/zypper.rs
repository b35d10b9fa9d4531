//! Zypper (openSUSE/SLES) update enumeration.
//!
//! `zypper list-updates` prints a pipe-delimited table. There is no
//! batched security source to pair with it, so every update is
//! reported as non-security.

use pm_common::PendingUpdate;

use super::runner::CommandRunner;
use super::{require_success, ProbeError};

pub fn pending_updates(runner: &CommandRunner) -> Result<Vec<PendingUpdate>, ProbeError> {
    let output = require_success(
        runner.run("zypper", &["list-updates"])?,
        "zypper list-updates",
    )?;

    Ok(parse_list_updates(&output.stdout_str()))
}

/// Parse the `list-updates` table.
///
/// A qualifying line contains `|` and does not start with the header's
/// status column `S`. Fields are split on `|` and trimmed; at least
/// four are required: field 1 is the package name, field 2 the current
/// version, field 3 the available version.
pub fn parse_list_updates(stdout: &str) -> Vec<PendingUpdate> {
    let mut updates = Vec::new();

    for line in stdout.lines() {
        if !line.contains('|') || line.starts_with('S') {
            continue;
        }
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        if parts.len() >= 4 {
            updates.push(PendingUpdate::new(
                parts[1],
                parts[2],
                Some(parts[3].to_string()),
            ));
        }
    }

    updates
}
