//! No-mock settings resolution + validation tests.
//!
//! Covers:
//! - agent.toml loading against real files on disk
//! - Resolution order (CLI > env path > env dir > XDG)
//! - Layered merge semantics (file over defaults)

use pm_config::resolve::{resolve_config, ConfigSource};
use pm_config::settings::{AgentSettings, SettingsFile};
use pm_config::validate::{validate_settings, ValidationError};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_settings(dir: &Path, contents: &str) -> std::path::PathBuf {
    fs::create_dir_all(dir).expect("create config dir");
    let path = dir.join("agent.toml");
    fs::write(&path, contents).expect("write agent.toml");
    path
}

const VALID_TOML: &str = r#"
server_url = "https://patchmon.example.com"
agent_token = "tok-abc"
interval_secs = 600
"#;

#[test]
fn test_load_and_merge_valid_file() {
    let temp = TempDir::new().expect("temp dir");
    let path = write_settings(temp.path(), VALID_TOML);

    let file = SettingsFile::from_file(&path).expect("load agent.toml");
    let mut settings = AgentSettings::default();
    settings.merge_file(file);

    assert_eq!(
        settings.server_url.as_deref(),
        Some("https://patchmon.example.com")
    );
    assert_eq!(settings.agent_token.as_deref(), Some("tok-abc"));
    assert_eq!(settings.interval_secs, 600);
    assert_eq!(settings.command_timeout_secs, 30);

    validate_settings(&settings, true).expect("merged settings should validate");
}

#[test]
fn test_load_rejects_bad_toml() {
    let temp = TempDir::new().expect("temp dir");
    let path = write_settings(temp.path(), "interval_secs = \"not a number\"");

    let err = SettingsFile::from_file(&path).expect_err("bad TOML should fail");
    assert!(matches!(err, ValidationError::ParseError(_)));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("does-not-exist.toml");

    let err = SettingsFile::from_file(&path).expect_err("missing file should fail");
    assert!(matches!(err, ValidationError::IoError(_)));
}

#[test]
fn test_resolve_cli_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&["PM_CONFIG", "PM_CONFIG_DIR", "XDG_CONFIG_HOME"]);

        let temp = TempDir::new().expect("temp dir");
        let cli_path = write_settings(&temp.path().join("cli"), VALID_TOML);
        let env_path = write_settings(&temp.path().join("env"), VALID_TOML);

        env::set_var("PM_CONFIG", env_path.display().to_string());

        let paths = resolve_config(Some(&cli_path));
        assert_eq!(paths.settings_source, ConfigSource::CliArgument);
        assert_eq!(paths.settings.unwrap(), cli_path);
    });
}

#[test]
fn test_resolve_env_path_over_env_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&["PM_CONFIG", "PM_CONFIG_DIR", "XDG_CONFIG_HOME"]);

        let temp = TempDir::new().expect("temp dir");
        let env_path = write_settings(&temp.path().join("env"), VALID_TOML);
        let dir = temp.path().join("dir");
        write_settings(&dir, VALID_TOML);

        env::set_var("PM_CONFIG", env_path.display().to_string());
        env::set_var("PM_CONFIG_DIR", dir.display().to_string());

        let paths = resolve_config(None);
        assert_eq!(paths.settings_source, ConfigSource::Environment);
        assert_eq!(paths.settings.unwrap(), env_path);
    });
}

#[test]
fn test_resolve_env_dir_fallback() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&["PM_CONFIG", "PM_CONFIG_DIR", "XDG_CONFIG_HOME"]);

        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("dir");
        let expected = write_settings(&dir, VALID_TOML);

        env::remove_var("PM_CONFIG");
        env::set_var("PM_CONFIG_DIR", dir.display().to_string());

        let paths = resolve_config(None);
        assert_eq!(paths.settings_source, ConfigSource::Environment);
        assert_eq!(paths.settings.unwrap(), expected);
    });
}

#[test]
fn test_resolve_xdg_fallback() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&["PM_CONFIG", "PM_CONFIG_DIR", "XDG_CONFIG_HOME"]);

        let temp = TempDir::new().expect("temp dir");
        let xdg_dir = temp.path().join("xdg");
        let app_dir = xdg_dir.join("patchmon");
        let expected = write_settings(&app_dir, VALID_TOML);

        env::remove_var("PM_CONFIG");
        env::remove_var("PM_CONFIG_DIR");
        env::set_var("XDG_CONFIG_HOME", xdg_dir.display().to_string());

        let paths = resolve_config(None);
        assert_eq!(paths.settings_source, ConfigSource::XdgConfig);
        assert_eq!(paths.settings.unwrap(), expected);
    });
}

#[test]
fn test_missing_cli_path_falls_through() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&["PM_CONFIG", "PM_CONFIG_DIR", "XDG_CONFIG_HOME"]);

        let temp = TempDir::new().expect("temp dir");
        let xdg_dir = temp.path().join("xdg");
        let app_dir = xdg_dir.join("patchmon");
        let expected = write_settings(&app_dir, VALID_TOML);

        env::remove_var("PM_CONFIG");
        env::remove_var("PM_CONFIG_DIR");
        env::set_var("XDG_CONFIG_HOME", xdg_dir.display().to_string());

        // CLI path that does not exist is skipped, not an error.
        let missing = temp.path().join("missing.toml");
        let paths = resolve_config(Some(&missing));
        assert_eq!(paths.settings_source, ConfigSource::XdgConfig);
        assert_eq!(paths.settings.unwrap(), expected);
    });
}
