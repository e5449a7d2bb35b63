//! Application configuration with layered loading.
//!
//! Configuration is assembled with figment from multiple sources:
//!
//! 1. Environment variables (FORA_*)
//! 2. TOML config file (if FORA_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Browser identity sent with every request; several forums turn away
/// anything that does not look like a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Ubuntu; Linux i686; rv:21.0) Gecko/20100101 Firefox/21.0";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FORA_*)
/// 2. TOML config file (if FORA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-Agent string for HTTP requests.
    ///
    /// Set via FORA_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Attempts per request before giving up.
    ///
    /// Set via FORA_TRIES environment variable.
    #[serde(default = "default_tries")]
    pub tries: u32,

    /// Fixed delay between attempts in milliseconds.
    ///
    /// Set via FORA_RETRY_DELAY_MS environment variable.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FORA_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// questionablequesting.com account name.
    ///
    /// Set via FORA_QQ_USERNAME environment variable.
    #[serde(default)]
    pub qq_username: Option<String>,

    /// questionablequesting.com password.
    ///
    /// Set via FORA_QQ_PASSWORD environment variable.
    #[serde(default)]
    pub qq_password: Option<String>,
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

fn default_tries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            tries: default_tries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            qq_username: None,
            qq_password: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay between attempts as Duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FORA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(Env::prefixed("FORA_").map(|key| key.as_str().to_lowercase().into()));

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Credentials for questionablequesting.com, when both halves are set.
    pub fn qq_credentials(&self) -> Option<(&str, &str)> {
        match (&self.qq_username, &self.qq_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.user_agent, BROWSER_USER_AGENT);
        assert_eq!(config.tries, 3);
        assert_eq!(config.retry_delay_ms, 1_000);
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.qq_username.is_none());
        assert!(config.qq_password.is_none());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_qq_credentials_need_both_halves() {
        let config = AppConfig { qq_username: Some("reader".into()), ..Default::default() };
        assert_eq!(config.qq_credentials(), None);

        let config =
            AppConfig { qq_username: Some("Reader".into()), qq_password: Some("hunter2".into()), ..Default::default() };
        assert_eq!(config.qq_credentials(), Some(("Reader", "hunter2")));
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FORA_TRIES", "5");
            jail.set_env("FORA_RETRY_DELAY_MS", "250");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.tries, 5);
            assert_eq!(config.retry_delay_ms, 250);
            assert_eq!(config.user_agent, BROWSER_USER_AGENT);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("fora.toml", "tries = 2\ntimeout_ms = 5000\n")?;
            jail.set_env("FORA_CONFIG_FILE", "fora.toml");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.tries, 2);
            assert_eq!(config.timeout_ms, 5_000);
            Ok(())
        });
    }
}
