//! Canonical patch-state data model.
//!
//! These types are the structured output of one collection cycle, designed
//! for serialization to the collector. `AgentReport` is a wire contract:
//! downstream consumers depend on its field names and value semantics
//! verbatim, so changes require a coordinated collector release.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Package-manager family detected on the host.
///
/// Determined once per collection cycle and never changes mid-cycle.
/// `dnf` and `yum` share one variant because they share output formats
/// and advisory tooling; the probe layer remembers which binary answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerKind {
    /// APT (Debian, Ubuntu).
    Apt,
    /// DNF or YUM (Fedora, RHEL, CentOS).
    DnfYum,
    /// Zypper (openSUSE, SLES).
    Zypper,
    /// Pacman (Arch).
    Pacman,
    /// No supported package manager found on this host.
    Unknown,
}

impl ManagerKind {
    /// Whether a supported package manager was actually detected.
    pub fn is_known(self) -> bool {
        !matches!(self, ManagerKind::Unknown)
    }
}

impl std::fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ManagerKind::Apt => "apt",
            ManagerKind::DnfYum => "dnf/yum",
            ManagerKind::Zypper => "zypper",
            ManagerKind::Pacman => "pacman",
            ManagerKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Severity bucket for a pending update.
///
/// The engine produces exactly two buckets: `critical` for security
/// updates, `low` for everything else. The collector's wider taxonomy
/// is its own concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Critical,
    Low,
}

impl UpdateType {
    /// Derive the bucket from the security flag.
    pub fn from_security(is_security: bool) -> Self {
        if is_security {
            UpdateType::Critical
        } else {
            UpdateType::Low
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateType::Critical => write!(f, "critical"),
            UpdateType::Low => write!(f, "low"),
        }
    }
}

/// One pending package update as enumerated from the package manager.
///
/// `update_type` is mechanically derived from `is_security`; construct
/// through [`PendingUpdate::new`] and [`PendingUpdate::set_security`] so
/// the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    /// Package name as the manager reports it (may carry an arch suffix
    /// on DNF/YUM systems).
    pub package_name: String,

    /// Installed version, or the literal `"unknown"` where the manager
    /// does not expose it.
    pub current_version: String,

    /// Version available for install, if the manager reports one.
    pub available_version: Option<String>,

    /// Whether a security advisory covers this update.
    pub is_security: bool,

    /// Severity bucket, always `critical` exactly when `is_security`.
    pub update_type: UpdateType,
}

impl PendingUpdate {
    /// Create a non-security pending update.
    pub fn new(
        package_name: impl Into<String>,
        current_version: impl Into<String>,
        available_version: Option<String>,
    ) -> Self {
        PendingUpdate {
            package_name: package_name.into(),
            current_version: current_version.into(),
            available_version,
            is_security: false,
            update_type: UpdateType::Low,
        }
    }

    /// Set the security flag, keeping `update_type` in lockstep.
    pub fn set_security(&mut self, is_security: bool) {
        self.is_security = is_security;
        self.update_type = UpdateType::from_security(is_security);
    }
}

/// Point-in-time, immutable record of a host's patch state.
///
/// Created fresh each collection cycle, owned by that cycle, and handed
/// by value to the transport. The engine keeps no history; correlating
/// snapshots over time is the collector's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSnapshot {
    /// When this snapshot was assembled (UTC).
    pub collected_at: DateTime<Utc>,

    /// Package-manager family active during this cycle.
    pub manager: ManagerKind,

    /// Running kernel release (`uname -r` equivalent).
    pub kernel_version: String,

    /// Host boot time, if determinable.
    pub last_boot_time: Option<DateTime<Utc>>,

    /// Best-effort proxy for the last patch activity on this host.
    pub last_patch_time: Option<DateTime<Utc>>,

    /// Pending updates in enumeration order. Duplicates the manager
    /// emits are kept as-is; the engine does not deduplicate.
    pub pending_updates: Vec<PendingUpdate>,

    /// Whether the host needs a reboot for installed updates to take effect.
    pub needs_reboot: bool,
}

impl PatchSnapshot {
    /// Number of pending updates.
    pub fn pending_count(&self) -> usize {
        self.pending_updates.len()
    }

    /// Number of pending updates with a security advisory.
    pub fn security_count(&self) -> usize {
        self.pending_updates.iter().filter(|u| u.is_security).count()
    }
}

/// Static host identity facts gathered outside the patch engine proper.
///
/// Every field degrades independently: a fact that cannot be determined
/// is an empty string or `None`, never a collection failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostFacts {
    /// Host name (not the FQDN).
    pub hostname: String,

    /// OS name from os-release (e.g. "Ubuntu").
    pub os_name: String,

    /// OS version identifier from os-release (e.g. "22.04").
    pub os_version: String,

    /// Machine architecture (e.g. "x86_64").
    pub architecture: String,

    /// Running kernel release.
    pub kernel_version: String,

    /// Boot time derived from the kernel's btime counter.
    pub last_boot_time: Option<DateTime<Utc>>,
}

/// Wire payload posted to the collector each cycle.
///
/// Field set and names match the collector's agent-data schema; optional
/// timestamps serialize as explicit nulls when undeterminable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub architecture: String,
    pub kernel_version: String,
    pub last_boot_time: Option<DateTime<Utc>>,
    pub agent_version: String,
    pub last_patch_time: Option<DateTime<Utc>>,
    pub pending_updates: Vec<PendingUpdate>,
    pub needs_reboot: bool,
}

impl AgentReport {
    /// Flatten host facts and a snapshot into the wire payload.
    pub fn assemble(facts: HostFacts, snapshot: PatchSnapshot) -> Self {
        AgentReport {
            hostname: facts.hostname,
            os_name: facts.os_name,
            os_version: facts.os_version,
            architecture: facts.architecture,
            kernel_version: snapshot.kernel_version,
            last_boot_time: snapshot.last_boot_time,
            agent_version: crate::AGENT_VERSION.to_string(),
            last_patch_time: snapshot.last_patch_time,
            pending_updates: snapshot.pending_updates,
            needs_reboot: snapshot.needs_reboot,
        }
    }
}
