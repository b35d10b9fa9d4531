//! Error types for Patch Monitor.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for the daemon's retry logic
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! Errors can be formatted for human consumption with headline, reason, and fix:
//! ```text
//! ✗ Configuration Error
//!   Reason: invalid settings: server_url must use http or https
//!   Fix: Run 'pm-agent check' to validate configuration, or fix agent.toml.
//! ```
//!
//! # Machine-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 31,
//!   "category": "transport",
//!   "message": "collector rejected report: HTTP 401",
//!   "recoverable": false
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Patch Monitor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file and settings errors.
    Config,
    /// Package-manager probing and collection errors.
    Collection,
    /// Collector delivery errors (HTTP, auth).
    Transport,
    /// File I/O and serialization errors.
    Io,
    /// Platform compatibility errors.
    Platform,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Collection => write!(f, "collection"),
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Platform => write!(f, "platform"),
        }
    }
}

/// Unified error type for Patch Monitor.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    // Collection errors (20-29)
    #[error("collection failed: {0}")]
    Collection(String),

    #[error("command not available: {program}")]
    CommandUnavailable { program: String },

    #[error("command {program} failed with exit code {code}")]
    CommandFailed { program: String, code: i32 },

    #[error("command {program} timed out after {seconds}s")]
    CommandTimedOut { program: String, seconds: u64 },

    // Transport errors (30-39)
    #[error("collector unreachable: {0}")]
    Transport(String),

    #[error("collector rejected report: HTTP {status}")]
    ServerRejected { status: u16 },

    #[error("collector rejected credentials")]
    Unauthorized,

    // I/O errors (40-49)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Platform errors (50-59)
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Collection errors
    /// - 30-39: Transport errors
    /// - 40-49: I/O errors
    /// - 50-59: Platform errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidSettings(_) => 11,
            Error::Collection(_) => 20,
            Error::CommandUnavailable { .. } => 21,
            Error::CommandFailed { .. } => 22,
            Error::CommandTimedOut { .. } => 23,
            Error::Transport(_) => 30,
            Error::ServerRejected { .. } => 31,
            Error::Unauthorized => 32,
            Error::Io(_) => 40,
            Error::Json(_) => 41,
            Error::UnsupportedPlatform(_) => 50,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidSettings(_) => ErrorCategory::Config,

            Error::Collection(_)
            | Error::CommandUnavailable { .. }
            | Error::CommandFailed { .. }
            | Error::CommandTimedOut { .. } => ErrorCategory::Collection,

            Error::Transport(_) | Error::ServerRejected { .. } | Error::Unauthorized => {
                ErrorCategory::Transport
            }

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,

            Error::UnsupportedPlatform(_) => ErrorCategory::Platform,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// The daemon uses this to decide between retrying next cycle and
    /// treating the condition as permanent for this host.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Config errors: recoverable by fixing the config
            Error::Config(_) => true,
            Error::InvalidSettings(_) => true,

            // Collection: mostly transient (locks, repo refresh)
            Error::Collection(_) => true,
            Error::CommandUnavailable { .. } => false, // Binary is absent
            Error::CommandFailed { .. } => true,
            Error::CommandTimedOut { .. } => true,

            // Transport: network comes back, credentials do not
            Error::Transport(_) => true,
            Error::ServerRejected { .. } => true,
            Error::Unauthorized => false,

            // I/O: often transient
            Error::Io(_) => true,
            Error::Json(_) => false,

            // Platform: not recoverable at runtime
            Error::UnsupportedPlatform(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'pm-agent check' to validate configuration, or check syntax in agent.toml."
            }
            Error::InvalidSettings(_) => {
                "Fix the listed settings in agent.toml or the PM_* environment variables."
            }

            Error::Collection(_) => {
                "Retry the collection. If persistent, run the package manager by hand to see its output."
            }
            Error::CommandUnavailable { .. } => {
                "Install the package manager tooling, or verify PATH for the agent's service unit."
            }
            Error::CommandFailed { .. } => {
                "Run the failing command by hand. A held package lock or broken repo metadata is the usual cause."
            }
            Error::CommandTimedOut { .. } => {
                "Increase --timeout. Slow mirrors and cold metadata caches are the usual cause."
            }

            Error::Transport(_) => {
                "Check the collector URL and network path. The daemon retries next cycle."
            }
            Error::ServerRejected { .. } => {
                "Check collector logs for the rejection reason. A schema mismatch means the agent needs updating."
            }
            Error::Unauthorized => {
                "The agent token was rejected. Re-enroll this host or update PM_AGENT_TOKEN."
            }

            Error::Io(_) => {
                "Check disk space, permissions, and that config directories exist. Retry the operation."
            }
            Error::Json(_) => {
                "Internal serialization failure. Report this with the full log output."
            }

            Error::UnsupportedPlatform(_) => {
                "This agent only supports Linux hosts with APT, DNF/YUM, Zypper, or Pacman."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidSettings(_) => "Invalid Settings",

            Error::Collection(_) => "Collection Error",
            Error::CommandUnavailable { .. } => "Command Not Available",
            Error::CommandFailed { .. } => "Command Failed",
            Error::CommandTimedOut { .. } => "Command Timeout",

            Error::Transport(_) => "Collector Unreachable",
            Error::ServerRejected { .. } => "Report Rejected",
            Error::Unauthorized => "Authentication Failed",

            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Serialization Error",

            Error::UnsupportedPlatform(_) => "Unsupported Platform",
        }
    }
}

/// Structured error response for JSON output.
///
/// Used by `--format json` for machine-parseable error reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
