//! Exit codes for the pm-agent CLI.
//!
//! Exit codes communicate operation outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-6: Success/operational outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

/// Exit codes for pm-agent operations.
///
/// These codes are a stable contract for automation. Changes require
/// a major version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Success / Operational Outcomes (0-6)
    // ========================================================================
    /// Success: snapshot collected (and delivered, where requested)
    Clean = 0,

    /// Snapshot collected but one or more probes degraded to empty results
    Degraded = 1,

    /// Daemon stopped cleanly on request
    Stopped = 2,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Configuration invalid or unreadable
    ConfigError = 11,

    /// Collector delivery failed
    TransportError = 12,

    /// Collector rejected the agent token
    AuthError = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success (codes 0-2).
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Degraded | ExitCode::Stopped)
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    /// These can be resolved by user action.
    pub fn is_user_error(self) -> bool {
        let code = self as i32;
        (10..20).contains(&code)
    }

    /// Check if this exit code is an internal error (codes 20-29).
    /// These indicate bugs and should be reported.
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Degraded => "OK_DEGRADED",
            ExitCode::Stopped => "OK_STOPPED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::TransportError => "ERR_TRANSPORT",
            ExitCode::AuthError => "ERR_AUTH",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::Degraded.is_success());
        assert!(!ExitCode::TransportError.is_success());
    }

    #[test]
    fn test_error_ranges() {
        assert!(ExitCode::ConfigError.is_user_error());
        assert!(ExitCode::AuthError.is_user_error());
        assert!(!ExitCode::ConfigError.is_internal_error());
        assert!(ExitCode::InternalError.is_internal_error());
    }

    #[test]
    fn test_stable_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::Degraded.as_i32(), 1);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::ConfigError.as_i32(), 11);
        assert_eq!(ExitCode::TransportError.as_i32(), 12);
        assert_eq!(ExitCode::AuthError.as_i32(), 13);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::Clean.to_string(), "OK_CLEAN (0)");
        assert_eq!(ExitCode::AuthError.to_string(), "ERR_AUTH (13)");
    }
}
