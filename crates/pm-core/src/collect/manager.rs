//! Package-manager detection.
//!
//! Detection probes a fixed priority list of binaries with `--version`
//! and stops at the first that answers. The probe runs fresh every
//! collection cycle so a host that gains or loses tooling between
//! cycles is picked up without an agent restart.

use pm_common::ManagerKind;
use tracing::{debug, warn};

use super::runner::CommandRunner;

/// A detected package manager: the family plus the binary that
/// answered the probe.
///
/// The split matters for DNF/YUM where both binaries share one output
/// format but only one is installed; enumeration must invoke the one
/// that actually answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manager {
    pub kind: ManagerKind,
    pub program: String,
}

impl Manager {
    pub fn new(kind: ManagerKind, program: impl Into<String>) -> Self {
        Manager {
            kind,
            program: program.into(),
        }
    }
}

/// Probe candidates in priority order. First hit wins; `apt` outranks
/// `apt-get` but either maps to the APT family.
const PROBE_ORDER: &[(ManagerKind, &[&str])] = &[
    (ManagerKind::Apt, &["apt", "apt-get"]),
    (ManagerKind::DnfYum, &["dnf"]),
    (ManagerKind::DnfYum, &["yum"]),
    (ManagerKind::Zypper, &["zypper"]),
    (ManagerKind::Pacman, &["pacman"]),
];

/// Detect the package manager by probing known binaries.
///
/// Returns `None` when no supported manager answers; callers degrade
/// to an empty snapshot rather than failing the cycle.
pub fn detect(runner: &CommandRunner) -> Option<Manager> {
    let manager = detect_with(|program| match runner.run(program, &["--version"]) {
        Ok(output) => output.success(),
        Err(e) => {
            debug!(program, error = %e, "probe failed");
            false
        }
    });

    match &manager {
        Some(m) => debug!(kind = %m.kind, program = %m.program, "package manager detected"),
        None => warn!("no supported package manager found"),
    }

    manager
}

/// Detection against an injected probe, for tests and dry runs.
///
/// `probe` returns whether `<program> --version` exits zero.
pub fn detect_with<P: FnMut(&str) -> bool>(mut probe: P) -> Option<Manager> {
    for (kind, programs) in PROBE_ORDER {
        for program in *programs {
            if probe(program) {
                return Some(Manager::new(*kind, *program));
            }
        }
    }
    None
}
