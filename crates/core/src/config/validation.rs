//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `tries` is 0 or exceeds 10
    /// - `retry_delay_ms` exceeds one minute
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - only one of `qq_username` / `qq_password` is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tries == 0 {
            return Err(ConfigError::Invalid { field: "tries".into(), reason: "must be at least 1".into() });
        }
        if self.tries > 10 {
            return Err(ConfigError::Invalid { field: "tries".into(), reason: "must not exceed 10".into() });
        }

        if self.retry_delay_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "retry_delay_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.qq_username.is_some() != self.qq_password.is_some() {
            return Err(ConfigError::Invalid {
                field: "qq_username/qq_password".into(),
                reason: "must be set together".into(),
            });
        }

        if self.retry_delay_ms == 0 {
            tracing::warn!(tries = self.tries, "retry_delay_ms is 0; retries will hit the site back to back");
        }

        Ok(())
    }
}
