//! Patch state collection.
//!
//! One collection cycle runs strictly in sequence: detect the package
//! manager, enumerate pending updates (classified against one batched
//! security query), probe the last patch time, check whether a reboot
//! is pending, then assemble the immutable snapshot. Every probe
//! absorbs its own failures into an empty or null result; a cycle
//! always produces a snapshot.

pub mod apt;
pub mod dnf;
pub mod last_patch;
pub mod manager;
pub mod pacman;
pub mod reboot;
pub mod runner;
pub mod sysinfo;
pub mod zypper;

pub use manager::{detect, detect_with, Manager};
pub use runner::{CommandOutput, CommandRunner, RunError, RunnerConfig};
pub use sysinfo::host_facts;

use chrono::Utc;
use pm_common::{AgentReport, HostFacts, ManagerKind, PatchSnapshot, PendingUpdate};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Failure of one external probe.
///
/// Probes return these internally so the reason stays inspectable;
/// the cycle boundary collapses them to empty results and a log line.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("{program} exited with code {}", .code.map_or_else(|| String::from("none"), |c| c.to_string()))]
    CommandFailed { program: String, code: Option<i32> },

    #[error("{program} timed out")]
    TimedOut { program: String },
}

impl ProbeError {
    pub(crate) fn command_failed(program: impl Into<String>, code: Option<i32>) -> Self {
        ProbeError::CommandFailed {
            program: program.into(),
            code,
        }
    }

    pub(crate) fn timed_out(program: impl Into<String>) -> Self {
        ProbeError::TimedOut {
            program: program.into(),
        }
    }
}

/// Map an output to an error unless the command exited zero in time.
pub(crate) fn require_success(
    output: CommandOutput,
    label: &str,
) -> Result<CommandOutput, ProbeError> {
    if output.timed_out {
        return Err(ProbeError::timed_out(label));
    }
    if !output.success() {
        return Err(ProbeError::command_failed(label, output.exit_code));
    }
    Ok(output)
}

/// Options governing one collection cycle.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub runner: RunnerConfig,
    /// Attempt a metadata refresh before enumerating (APT only).
    pub refresh_metadata: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        CollectOptions {
            runner: RunnerConfig::default(),
            refresh_metadata: true,
        }
    }
}

/// One completed collection cycle.
#[derive(Debug, Clone)]
pub struct Collection {
    pub facts: HostFacts,
    pub snapshot: PatchSnapshot,
    /// Human-readable labels for probes that fell back to empty
    /// results this cycle.
    pub degradations: Vec<String>,
}

impl Collection {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Flatten into the wire payload posted to the collector.
    pub fn into_report(self) -> AgentReport {
        AgentReport::assemble(self.facts, self.snapshot)
    }
}

/// Run one full collection cycle.
///
/// Never fails: a host with no supported manager, or one whose probes
/// all error, still yields a snapshot with empty updates and the
/// degradations recorded.
#[instrument(skip_all)]
pub fn collect_snapshot(options: &CollectOptions) -> Collection {
    let runner = CommandRunner::new(options.runner.clone());
    let facts = sysinfo::host_facts();
    let mut degradations = Vec::new();

    let manager = manager::detect(&runner);
    let kind = manager.as_ref().map_or(ManagerKind::Unknown, |m| m.kind);
    if kind == ManagerKind::Unknown {
        degradations.push("no supported package manager".to_string());
    }

    let pending_updates = match &manager {
        Some(m) => match enumerate(&runner, m, options.refresh_metadata) {
            Ok(updates) => updates,
            Err(e) => {
                warn!(manager = %m.kind, error = %e, "update enumeration failed");
                degradations.push(format!("update enumeration failed: {e}"));
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let last_patch_time = last_patch::last_patch_time(kind);
    let needs_reboot = reboot::needs_reboot(&runner, kind);

    let snapshot = assemble_snapshot(kind, &facts, pending_updates, last_patch_time, needs_reboot);
    info!(
        manager = %snapshot.manager,
        pending = snapshot.pending_count(),
        security = snapshot.security_count(),
        needs_reboot = snapshot.needs_reboot,
        degraded = !degradations.is_empty(),
        "collection cycle complete"
    );

    Collection {
        facts,
        snapshot,
        degradations,
    }
}

/// Enumerate and classify pending updates for the detected manager.
pub fn enumerate(
    runner: &CommandRunner,
    manager: &Manager,
    refresh_metadata: bool,
) -> Result<Vec<PendingUpdate>, ProbeError> {
    match manager.kind {
        ManagerKind::Apt => apt::pending_updates(runner, refresh_metadata),
        ManagerKind::DnfYum => dnf::pending_updates(runner, &manager.program),
        ManagerKind::Zypper => zypper::pending_updates(runner),
        ManagerKind::Pacman => pacman::pending_updates(runner),
        ManagerKind::Unknown => Ok(Vec::new()),
    }
}

/// Combine cycle outputs into the immutable snapshot. Pure; all inputs
/// have already been defaulted by their producers.
pub fn assemble_snapshot(
    manager: ManagerKind,
    facts: &HostFacts,
    pending_updates: Vec<PendingUpdate>,
    last_patch_time: Option<chrono::DateTime<Utc>>,
    needs_reboot: bool,
) -> PatchSnapshot {
    PatchSnapshot {
        collected_at: Utc::now(),
        manager,
        kernel_version: facts.kernel_version.clone(),
        last_boot_time: facts.last_boot_time,
        last_patch_time,
        pending_updates,
        needs_reboot,
    }
}
