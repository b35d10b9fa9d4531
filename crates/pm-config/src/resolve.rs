//! Configuration file resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG path → /etc → defaults.

use std::path::{Path, PathBuf};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to agent.toml (or None if not found).
    pub settings: Option<PathBuf>,

    /// Source of the settings file (for diagnostics).
    pub settings_source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/patchmon/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
const ENV_SETTINGS_PATH: &str = "PM_CONFIG";
const ENV_CONFIG_DIR: &str = "PM_CONFIG_DIR";

/// Standard config file name.
const SETTINGS_FILENAME: &str = "agent.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "patchmon";

/// Resolve the settings file path using the standard resolution order.
///
/// Resolution order:
/// 1. Explicit CLI path (if provided)
/// 2. PM_CONFIG environment variable (direct path)
/// 3. PM_CONFIG_DIR environment variable + agent.toml
/// 4. XDG config directory (~/.config/patchmon/)
/// 5. System config (/etc/patchmon/)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_settings: Option<&Path>) -> ConfigPaths {
    let mut paths = ConfigPaths::default();

    // 1. CLI argument
    if let Some(path) = cli_settings {
        if path.exists() {
            paths.settings_source = ConfigSource::CliArgument;
            paths.settings = Some(path.to_path_buf());
            return paths;
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_SETTINGS_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            paths.settings_source = ConfigSource::Environment;
            paths.settings = Some(path);
            return paths;
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(SETTINGS_FILENAME);
        if path.exists() {
            paths.settings_source = ConfigSource::Environment;
            paths.settings = Some(path);
            return paths;
        }
    }

    // 4. XDG config directory
    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(SETTINGS_FILENAME);
        if path.exists() {
            paths.settings_source = ConfigSource::XdgConfig;
            paths.settings = Some(path);
            return paths;
        }
    }

    // 5. System config
    let system_path = system_config_dir().join(SETTINGS_FILENAME);
    if system_path.exists() {
        paths.settings_source = ConfigSource::SystemConfig;
        paths.settings = Some(system_path);
        return paths;
    }

    // 6. Built-in default (None)
    paths.settings_source = ConfigSource::BuiltinDefault;
    paths
}

/// Get the XDG config directory for patchmon.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", ConfigSource::SystemConfig), "system config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/patchmon"));
    }

    #[test]
    fn test_xdg_config_dir_suffix() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }
}
