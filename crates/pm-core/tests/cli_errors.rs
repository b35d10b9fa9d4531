//! CLI error handling tests for pm-agent.
//!
//! These tests verify that invalid arguments and commands produce
//! appropriate error messages and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the pm-agent binary.
fn pm_agent() -> Command {
    Command::cargo_bin("pm-agent").expect("pm-agent binary should exist")
}

// ============================================================================
// Invalid Subcommand Tests
// ============================================================================

mod invalid_subcommand {
    use super::*;

    #[test]
    fn unknown_command_fails() {
        pm_agent()
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}

// ============================================================================
// Invalid Option Tests
// ============================================================================

mod invalid_options {
    use super::*;

    #[test]
    fn unknown_global_flag_fails() {
        pm_agent()
            .arg("--nonexistent-flag")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn config_flag_requires_value() {
        pm_agent()
            .args(["collect", "--config"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn timeout_requires_numeric_value() {
        pm_agent()
            .args(["collect", "--timeout", "soon"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn interval_requires_numeric_value() {
        pm_agent()
            .args(["run", "--interval", "hourly"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}
