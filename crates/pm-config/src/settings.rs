//! Agent settings types and file loading.
//!
//! Settings merge in layers: built-in defaults, then agent.toml, then
//! CLI arguments and environment variables (applied by the binary).
//! This module owns the first two layers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, ValidationResult};

/// Default collection interval for daemon mode, in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Default per-command timeout for package-manager invocations, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Lowest accepted daemon interval. Anything shorter hammers the
/// package manager and the collector for no new information.
pub const MIN_INTERVAL_SECS: u64 = 60;

/// Fully resolved agent settings.
///
/// `server_url` and `agent_token` stay optional here: local commands
/// (`collect`, `check`) run without a collector. Delivery paths demand
/// them through [`crate::validate::validate_settings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Base URL of the collector (e.g. `https://patchmon.example.com`).
    pub server_url: Option<String>,

    /// Bearer token identifying this host to the collector.
    pub agent_token: Option<String>,

    /// Daemon collection interval in seconds.
    pub interval_secs: u64,

    /// Timeout applied to each package-manager invocation.
    pub command_timeout_secs: u64,

    /// Whether APT collection refreshes package metadata (best-effort)
    /// before enumerating updates.
    pub refresh_metadata: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            server_url: None,
            agent_token: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            refresh_metadata: true,
        }
    }
}

impl AgentSettings {
    /// Overlay values from a parsed agent.toml. Unset file fields leave
    /// the current value untouched.
    pub fn merge_file(&mut self, file: SettingsFile) {
        if file.server_url.is_some() {
            self.server_url = file.server_url;
        }
        if file.agent_token.is_some() {
            self.agent_token = file.agent_token;
        }
        if let Some(interval) = file.interval_secs {
            self.interval_secs = interval;
        }
        if let Some(timeout) = file.command_timeout_secs {
            self.command_timeout_secs = timeout;
        }
        if let Some(refresh) = file.refresh_metadata {
            self.refresh_metadata = refresh;
        }
    }
}

/// Raw agent.toml contents. Every field is optional; unset fields fall
/// through to the previous layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub agent_token: Option<String>,

    #[serde(default)]
    pub interval_secs: Option<u64>,

    #[serde(default)]
    pub command_timeout_secs: Option<u64>,

    #[serde(default)]
    pub refresh_metadata: Option<bool>,
}

impl SettingsFile {
    /// Read and parse an agent.toml file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&raw)
            .map_err(|e| ValidationError::ParseError(format!("{}: {}", path.display(), e)))
    }
}
