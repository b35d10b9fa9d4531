//! Pacman (Arch) update enumeration.
//!
//! `pacman -Qu` lists upgradable packages, one per line. Like Zypper
//! there is no batched security source, so every update is reported as
//! non-security. Note that `pacman -Qu` exits 1 when nothing is
//! upgradable, which surfaces as a probe error and degrades to an
//! empty list at the collection boundary.

use pm_common::PendingUpdate;

use super::runner::CommandRunner;
use super::{require_success, ProbeError};

pub fn pending_updates(runner: &CommandRunner) -> Result<Vec<PendingUpdate>, ProbeError> {
    let output = require_success(runner.run("pacman", &["-Qu"])?, "pacman -Qu")?;

    Ok(parse_upgrades(&output.stdout_str()))
}

/// Parse `pacman -Qu` output.
///
/// A qualifying line contains a space and at least two fields: token 0
/// is the package name, token 1 the installed `version-release` pair.
/// The current version is that pair truncated at the first hyphen and
/// the available version is the full pair as printed.
pub fn parse_upgrades(stdout: &str) -> Vec<PendingUpdate> {
    let mut updates = Vec::new();

    for line in stdout.lines() {
        if !line.contains(' ') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let current_version = match parts[1].split_once('-') {
            Some((version, _)) => version,
            None => parts[1],
        };

        updates.push(PendingUpdate::new(
            parts[0],
            current_version,
            Some(parts[1].to_string()),
        ));
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY_UPGRADES: &str = "\
bash 5.1.016-1 -> 5.1.016-2
linux 6.4.7.arch1-2 -> 6.4.8.arch1-1
openssl 3.1.1-1 -> 3.1.2-1
";

    #[test]
    fn test_parse_upgrades_fields() {
        let updates = parse_upgrades(QUERY_UPGRADES);
        assert_eq!(updates.len(), 3);

        // The second token is the installed pair; the arrow target is
        // not captured.
        assert_eq!(updates[0].package_name, "bash");
        assert_eq!(updates[0].current_version, "5.1.016");
        assert_eq!(updates[0].available_version.as_deref(), Some("5.1.016-1"));

        assert_eq!(updates[1].package_name, "linux");
        assert_eq!(updates[1].current_version, "6.4.7.arch1");
    }

    #[test]
    fn test_never_security() {
        let updates = parse_upgrades(QUERY_UPGRADES);
        assert!(updates.iter().all(|u| !u.is_security));
    }

    #[test]
    fn test_parse_skips_single_token_lines() {
        assert!(parse_upgrades("standalone\n").is_empty());
    }

    #[test]
    fn test_version_without_release_suffix() {
        let updates = parse_upgrades("tool 2024 -> 2025\n");
        assert_eq!(updates[0].current_version, "2024");
        assert_eq!(updates[0].available_version.as_deref(), Some("2024"));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_upgrades("").is_empty());
    }
}
