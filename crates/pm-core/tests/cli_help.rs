//! CLI help output tests for pm-agent.
//!
//! These tests verify that all commands correctly display their help
//! text without errors.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the pm-agent binary.
fn pm_agent() -> Command {
    Command::cargo_bin("pm-agent").expect("pm-agent binary should exist")
}

// ============================================================================
// Top-level Help Tests
// ============================================================================

mod top_level {
    use super::*;

    #[test]
    fn help_flag_works() {
        pm_agent()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Patch Monitor"));
    }

    #[test]
    fn help_subcommand_works() {
        pm_agent()
            .arg("help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Patch Monitor"));
    }

    #[test]
    fn version_flag_works() {
        pm_agent()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pm-agent"));
    }

    #[test]
    fn help_shows_all_commands() {
        pm_agent()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("collect"))
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("check"))
            .stdout(predicate::str::contains("version"));
    }

    #[test]
    fn help_shows_global_options() {
        pm_agent()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--format"))
            .stdout(predicate::str::contains("--verbose"))
            .stdout(predicate::str::contains("--config"))
            .stdout(predicate::str::contains("--timeout"));
    }
}

// ============================================================================
// Subcommand Help Tests
// ============================================================================

mod collect_command {
    use super::*;

    #[test]
    fn collect_help_works() {
        pm_agent()
            .args(["collect", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no delivery"));
    }

    #[test]
    fn collect_help_shows_options() {
        pm_agent()
            .args(["collect", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--no-refresh"));
    }
}

mod run_command {
    use super::*;

    #[test]
    fn run_help_works() {
        pm_agent()
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("deliver"));
    }

    #[test]
    fn run_help_shows_options() {
        pm_agent()
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--server-url"))
            .stdout(predicate::str::contains("--token"))
            .stdout(predicate::str::contains("--interval"))
            .stdout(predicate::str::contains("--once"));
    }
}

mod check_command {
    use super::*;

    #[test]
    fn check_help_works() {
        pm_agent()
            .args(["check", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Validate configuration"));
    }

    #[test]
    fn check_help_shows_options() {
        pm_agent()
            .args(["check", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--settings"))
            .stdout(predicate::str::contains("--managers"))
            .stdout(predicate::str::contains("--all"));
    }
}
