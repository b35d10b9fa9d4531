//! APT (Debian/Ubuntu) update enumeration.
//!
//! Two commands feed the result: `apt-get --just-print upgrade` yields
//! the set of packages coming from security or updates pockets, then
//! `apt list --upgradable` yields the pending list itself. The security
//! set is computed first so classification is a plain set lookup while
//! the upgradable lines stream through.

use std::collections::HashSet;

use pm_common::PendingUpdate;
use tracing::debug;

use super::runner::CommandRunner;
use super::{require_success, ProbeError};

/// Enumerate pending APT updates, classified by the security set.
///
/// A failure of the security probe degrades to an unclassified list;
/// only the upgradable listing itself failing surfaces as an error.
pub fn pending_updates(
    runner: &CommandRunner,
    refresh_metadata: bool,
) -> Result<Vec<PendingUpdate>, ProbeError> {
    if refresh_metadata {
        refresh_package_lists(runner);
    }

    let security = match security_packages(runner) {
        Ok(set) => set,
        Err(e) => {
            debug!(error = %e, "security classification unavailable");
            HashSet::new()
        }
    };

    let output = require_success(
        runner.run("apt", &["list", "--upgradable"])?,
        "apt list --upgradable",
    )?;

    let mut updates = parse_upgradable(&output.stdout_str());
    for update in &mut updates {
        update.set_security(security.contains(&update.package_name));
    }
    Ok(updates)
}

/// Refresh the package lists before enumerating. Best-effort: a host
/// where the agent lacks the privilege (or sudo is absent) still gets
/// a snapshot from the cached lists.
pub fn refresh_package_lists(runner: &CommandRunner) {
    match runner.run("sudo", &["apt", "update"]) {
        Ok(output) if output.success() => {
            debug!("package lists refreshed");
        }
        Ok(output) => {
            debug!(
                exit_code = ?output.exit_code,
                timed_out = output.timed_out,
                "apt update failed, using cached package lists"
            );
        }
        Err(e) => {
            debug!(error = %e, "could not refresh package lists");
        }
    }
}

/// Names of packages whose pending upgrade comes from a security or
/// updates pocket.
///
/// The exit code of `apt-get --just-print upgrade` is ignored: the
/// simulation exits non-zero on held packages yet still prints the
/// `Inst` lines this probe needs.
fn security_packages(runner: &CommandRunner) -> Result<HashSet<String>, ProbeError> {
    let output = runner.run("apt-get", &["--just-print", "upgrade"])?;
    if output.timed_out {
        return Err(ProbeError::timed_out("apt-get --just-print upgrade"));
    }
    Ok(parse_security_packages(&output.stdout_str()))
}

/// Parse `apt list --upgradable` output.
///
/// A qualifying line carries a `/` (package/suites) and the word
/// `upgradable`, with at least two whitespace-separated fields:
///
/// ```text
/// curl/focal-updates 7.68.0-1ubuntu2.18 amd64 [upgradable from: 7.68.0-1ubuntu2.14]
/// ```
///
/// Field 0 up to the slash is the package name, field 1 the current
/// version, field 2 (when present) the available version. Anything
/// else, headers included, is skipped.
pub fn parse_upgradable(stdout: &str) -> Vec<PendingUpdate> {
    let mut updates = Vec::new();

    for line in stdout.lines() {
        if !line.contains('/') || !line.contains("upgradable") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let package_name = match parts[0].split_once('/') {
            Some((name, _)) => name,
            None => parts[0],
        };
        let available_version = parts.get(2).map(|v| v.to_string());

        updates.push(PendingUpdate::new(package_name, parts[1], available_version));
    }

    updates
}

/// Parse `apt-get --just-print upgrade` output into the security set.
///
/// Qualifying lines are the `Inst` lines mentioning a security or
/// updates pocket; the second field is the package name.
pub fn parse_security_packages(stdout: &str) -> HashSet<String> {
    let mut packages = HashSet::new();

    for line in stdout.lines() {
        if !line.contains("Inst") {
            continue;
        }
        let lowered = line.to_lowercase();
        if !lowered.contains("security") && !lowered.contains("updates") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            packages.insert(parts[1].to_string());
        }
    }

    packages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_common::UpdateType;

    const UPGRADABLE: &str = "\
Listing... Done
curl/focal-updates 7.68.0-1ubuntu2.18 amd64 [upgradable from: 7.68.0-1ubuntu2.14]
libssl1.1/focal-updates,focal-security 1.1.1f-1ubuntu2.19 amd64 [upgradable from: 1.1.1f-1ubuntu2.16]
vim/focal 2:8.1.2269-1ubuntu5.22 amd64 [upgradable from: 2:8.1.2269-1ubuntu5.11]
";

    const JUST_PRINT: &str = "\
NOTE: This is only a simulation!
      apt-get needs root privileges for real execution.
Reading package lists... Done
Building dependency tree... Done
The following packages will be upgraded:
  curl libssl1.1 vim
Inst libssl1.1 [1.1.1f-1ubuntu2.16] (1.1.1f-1ubuntu2.19 Ubuntu:20.04/focal-security [amd64])
Inst curl [7.68.0-1ubuntu2.14] (7.68.0-1ubuntu2.18 Ubuntu:20.04/focal-updates [amd64])
Inst vim [2:8.1.2269-1ubuntu5.11] (2:8.1.2269-1ubuntu5.22 Ubuntu:20.04/focal [amd64])
Conf libssl1.1 (1.1.1f-1ubuntu2.19 Ubuntu:20.04/focal-security [amd64])
";

    #[test]
    fn test_parse_upgradable_fields() {
        let updates = parse_upgradable(UPGRADABLE);
        assert_eq!(updates.len(), 3);

        assert_eq!(updates[0].package_name, "curl");
        assert_eq!(updates[0].current_version, "7.68.0-1ubuntu2.18");
        assert_eq!(updates[0].available_version.as_deref(), Some("amd64"));

        assert_eq!(updates[1].package_name, "libssl1.1");
        assert_eq!(updates[2].package_name, "vim");
    }

    #[test]
    fn test_parse_upgradable_skips_header() {
        let updates = parse_upgradable("Listing... Done\n");
        assert!(updates.is_empty());
    }

    #[test]
    fn test_parse_upgradable_requires_slash_and_keyword() {
        // No slash.
        assert!(parse_upgradable("curl 7.68.0 amd64 [upgradable]\n").is_empty());
        // No "upgradable".
        assert!(parse_upgradable("curl/focal-updates 7.68.0 amd64\n").is_empty());
        // Fewer than two fields.
        assert!(parse_upgradable("curl/focal-updates,upgradable\n").is_empty());
    }

    #[test]
    fn test_parse_upgradable_two_fields_has_no_available_version() {
        let updates = parse_upgradable("tmux/jammy 3.2a-4-upgradable\n");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].package_name, "tmux");
        assert_eq!(updates[0].current_version, "3.2a-4-upgradable");
        assert_eq!(updates[0].available_version, None);
    }

    #[test]
    fn test_parse_security_packages() {
        let packages = parse_security_packages(JUST_PRINT);
        // vim comes from the plain focal pocket, not security or updates.
        assert_eq!(packages.len(), 2);
        assert!(packages.contains("libssl1.1"));
        assert!(packages.contains("curl"));
        assert!(!packages.contains("vim"));
    }

    #[test]
    fn test_parse_security_packages_ignores_conf_lines() {
        let packages = parse_security_packages(
            "Conf openssl (3.0.2-0ubuntu1.15 Ubuntu:22.04/jammy-security [amd64])\n",
        );
        assert!(packages.is_empty());
    }

    #[test]
    fn test_security_classification_wiring() {
        let security = parse_security_packages(JUST_PRINT);
        let mut updates = parse_upgradable(UPGRADABLE);
        for update in &mut updates {
            update.set_security(security.contains(&update.package_name));
        }

        assert!(updates[0].is_security);
        assert_eq!(updates[0].update_type, UpdateType::Critical);
        assert!(updates[1].is_security);
        assert!(!updates[2].is_security);
        assert_eq!(updates[2].update_type, UpdateType::Low);
    }

    #[test]
    fn test_parse_upgradable_empty_input() {
        assert!(parse_upgradable("").is_empty());
        assert!(parse_security_packages("").is_empty());
    }
}
