//! Settings validation errors and semantic validation.

use thiserror::Error;
use url::Url;

use crate::settings::{AgentSettings, MIN_INTERVAL_SECS};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Settings validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::MissingField(_) => 62,
            ValidationError::InvalidValue { .. } => 63,
        }
    }
}

/// Validate agent settings semantically.
///
/// `delivery_required` is true for commands that post to the collector
/// (`run`, daemon mode); local-only commands validate the same limits
/// but tolerate missing collector credentials.
pub fn validate_settings(
    settings: &AgentSettings,
    delivery_required: bool,
) -> ValidationResult<()> {
    if let Some(ref raw) = settings.server_url {
        let url = Url::parse(raw).map_err(|e| ValidationError::InvalidValue {
            field: "server_url".to_string(),
            message: format!("not a valid URL: {}", e),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::InvalidValue {
                field: "server_url".to_string(),
                message: format!("scheme must be http or https, got {}", url.scheme()),
            });
        }
    } else if delivery_required {
        return Err(ValidationError::MissingField("server_url".to_string()));
    }

    if delivery_required {
        match settings.agent_token.as_deref() {
            None => return Err(ValidationError::MissingField("agent_token".to_string())),
            Some("") => {
                return Err(ValidationError::InvalidValue {
                    field: "agent_token".to_string(),
                    message: "must not be empty".to_string(),
                })
            }
            Some(_) => {}
        }
    }

    if settings.interval_secs < MIN_INTERVAL_SECS {
        return Err(ValidationError::InvalidValue {
            field: "interval_secs".to_string(),
            message: format!(
                "must be at least {}, got {}",
                MIN_INTERVAL_SECS, settings.interval_secs
            ),
        });
    }

    if settings.command_timeout_secs == 0 {
        return Err(ValidationError::InvalidValue {
            field: "command_timeout_secs".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    if settings.command_timeout_secs > 3600 {
        return Err(ValidationError::InvalidValue {
            field: "command_timeout_secs".to_string(),
            message: format!("must be at most 3600, got {}", settings.command_timeout_secs),
        });
    }

    Ok(())
}
