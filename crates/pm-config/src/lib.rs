//! Patch Monitor agent configuration loading and validation.
//!
//! This crate provides:
//! - Typed settings for agent.toml
//! - Config file resolution (CLI → environment → XDG → /etc → defaults)
//! - Semantic validation with stable error codes

pub mod resolve;
pub mod settings;
pub mod validate;

pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use settings::{AgentSettings, SettingsFile};
pub use validate::{validate_settings, ValidationError, ValidationResult};
