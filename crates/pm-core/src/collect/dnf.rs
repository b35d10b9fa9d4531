//! DNF and YUM update enumeration.
//!
//! Both binaries share one output format, so one module serves both;
//! the caller passes whichever program answered detection.
//!
//! `check-update` exits 100 when updates are pending, 0 when none and
//! 1 on error. Its listing does not include the installed version, so
//! `current_version` is always the literal `"unknown"`. Security
//! classification comes from `updateinfo list security`, whose lines
//! end in a package token that is matched verbatim against enumerated
//! names.

use std::collections::HashSet;

use pm_common::PendingUpdate;
use tracing::{debug, error};

use super::runner::CommandRunner;
use super::ProbeError;

/// Headers and chatter that `check-update` mixes into its listing.
const SKIP_PREFIXES: &[&str] = &[
    "Last metadata",
    "Updating and loading",
    "Repositories loaded",
    "Importing GPG",
];

/// Enumerate pending DNF/YUM updates, classified by the advisory set.
pub fn pending_updates(
    runner: &CommandRunner,
    program: &str,
) -> Result<Vec<PendingUpdate>, ProbeError> {
    let security = match security_packages(runner, program) {
        Ok(set) => set,
        Err(e) => {
            debug!(program, error = %e, "security classification unavailable");
            HashSet::new()
        }
    };

    let output = runner.run(program, &["check-update", "--quiet", "--assumeyes"])?;
    if output.timed_out {
        return Err(ProbeError::timed_out(format!("{program} check-update")));
    }
    if !matches!(output.exit_code, Some(0) | Some(1) | Some(100)) {
        // Whatever made it to stdout is still parsed: a single failing
        // repository does not empty the listing from the healthy ones.
        error!(
            program,
            exit_code = ?output.exit_code,
            stderr = %output.stderr_str(),
            "check-update exited abnormally"
        );
    }

    let mut updates = parse_check_update(&output.stdout_str());
    for update in &mut updates {
        update.set_security(security.contains(&update.package_name));
    }
    Ok(updates)
}

/// Package tokens named by pending security advisories.
fn security_packages(
    runner: &CommandRunner,
    program: &str,
) -> Result<HashSet<String>, ProbeError> {
    let output = runner.run(program, &["updateinfo", "list", "security", "--quiet"])?;
    if output.timed_out {
        return Err(ProbeError::timed_out(format!("{program} updateinfo")));
    }
    Ok(parse_security_list(&output.stdout_str()))
}

/// Parse `check-update` output.
///
/// A qualifying line has exactly three whitespace-separated fields and
/// a dot in the first (`name.arch`): name, available version,
/// repository. The repository column is discarded. Metadata banners,
/// prompts and `section:`-style headers are skipped.
pub fn parse_check_update(stdout: &str) -> Vec<PendingUpdate> {
    let mut updates = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty()
            || SKIP_PREFIXES.iter().any(|p| line.starts_with(p))
            || line.contains("Is this ok")
            || (line.contains(':') && !line.contains('.'))
        {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() == 3 && parts[0].contains('.') {
            updates.push(PendingUpdate::new(
                parts[0],
                "unknown",
                Some(parts[1].to_string()),
            ));
        }
    }

    updates
}

/// Parse `updateinfo list security` output into the security set.
///
/// Each advisory line ends in a package token; the last field of every
/// non-header line with at least three fields is collected.
pub fn parse_security_list(stdout: &str) -> HashSet<String> {
    let mut packages = HashSet::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Last metadata") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 3 {
            packages.insert(parts[parts.len() - 1].to_string());
        }
    }

    packages
}
