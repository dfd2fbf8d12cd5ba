//! Configuration for the sandbox code runner
//!
//! A [`RunnerConfig`] carries the credentials and function identity used to
//! reach the control plane, plus the allocator timings. It can be read from a
//! TOML file or from the process environment:
//!
//! ```toml
//! function_id = "fn-sandbox-python"
//! access_key = "env:VOLCENGINE_ACCESS_KEY"
//! secret_key = "env:VOLCENGINE_SECRET_KEY"
//! region = "cn-beijing"
//! poll_interval = "3s"
//! ready_timeout = "30s"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_ACCESS_KEY: &str = "VOLCENGINE_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "VOLCENGINE_SECRET_KEY";
pub const ENV_REGION: &str = "VOLCENGINE_REGION";
pub const ENV_FUNCTION_ID: &str = "CODERUNNER_FUNCTION_ID";
pub const ENV_ENDPOINT: &str = "CODERUNNER_ENDPOINT";
pub const ENV_POLL_INTERVAL: &str = "CODERUNNER_POLL_INTERVAL";
pub const ENV_READY_TIMEOUT: &str = "CODERUNNER_READY_TIMEOUT";
pub const ENV_LOG_LEVEL: &str = "CODERUNNER_LOG_LEVEL";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("IO error reading config file: {message}")]
    IoError { message: String },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Access key id, literal or `env:VAR`
    #[serde(skip_serializing)]
    pub access_key: String,
    /// Secret access key, literal or `env:VAR`
    #[serde(skip_serializing)]
    pub secret_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Identity of the deployed function that owns the sandboxes
    pub function_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_service")]
    pub service: String,
    /// Interval between listings while waiting for a sandbox to become ready
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Overall bound on waiting for a ready sandbox
    #[serde(default = "default_ready_timeout", with = "humantime_serde")]
    pub ready_timeout: Duration,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_region() -> String {
    "cn-beijing".to_string()
}

fn default_endpoint() -> String {
    "https://open.volcengineapi.com".to_string()
}

fn default_api_version() -> String {
    "2024-06-06".to_string()
}

fn default_service() -> String {
    "vefaas".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl RunnerConfig {
    /// Build a config with default endpoint and timings.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        function_id: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            function_id: function_id.into(),
            endpoint: default_endpoint(),
            api_version: default_api_version(),
            service: default_service(),
            poll_interval: default_poll_interval(),
            ready_timeout: default_ready_timeout(),
            request_timeout: default_request_timeout(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file, resolving `env:` secrets.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut config: RunnerConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                message: format!("failed to parse {}: {}", path.display(), e),
            })?;

        config.access_key = resolve_secret("access_key", &config.access_key)?;
        config.secret_key = resolve_secret("secret_key", &config.secret_key)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::new(
            required_env(ENV_ACCESS_KEY)?,
            required_env(ENV_SECRET_KEY)?,
            env::var(ENV_REGION).unwrap_or_else(|_| default_region()),
            required_env(ENV_FUNCTION_ID)?,
        );

        if let Ok(endpoint) = env::var(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Ok(raw) = env::var(ENV_POLL_INTERVAL) {
            config.poll_interval = parse_duration(ENV_POLL_INTERVAL, &raw)?;
        }
        if let Ok(raw) = env::var(ENV_READY_TIMEOUT) {
            config.ready_timeout = parse_duration(ENV_READY_TIMEOUT, &raw)?;
        }
        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the runner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("access_key", &self.access_key),
            ("secret_key", &self.secret_key),
            ("region", &self.region),
            ("function_id", &self.function_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    key: key.to_string(),
                });
            }
        }

        url::Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidValue {
            key: "endpoint".to_string(),
            reason: e.to_string(),
        })?;

        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Resolve a value that may reference an environment variable.
///
/// `env:NAME` reads `NAME` from the environment; anything else is returned as is.
pub fn resolve_secret(key: &str, value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix("env:") {
        Some(var_name) => env::var(var_name).map_err(|_| ConfigError::MissingRequired {
            key: format!("{} (environment variable '{}')", key, var_name),
        }),
        None => Ok(value.to_string()),
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingRequired {
        key: key.to_string(),
    })
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in [
            ENV_ACCESS_KEY,
            ENV_SECRET_KEY,
            ENV_REGION,
            ENV_FUNCTION_ID,
            ENV_ENDPOINT,
            ENV_POLL_INTERVAL,
            ENV_READY_TIMEOUT,
            ENV_LOG_LEVEL,
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::new("ak", "sk", "cn-beijing", "fn-1");
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.ready_timeout, Duration::from_secs(30));
        assert_eq!(config.service, "vefaas");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_function_id() {
        let config = RunnerConfig::new("ak", "sk", "cn-beijing", " ");
        match config.validate() {
            Err(ConfigError::MissingRequired { key }) => assert_eq!(key, "function_id"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = RunnerConfig::new("ak", "sk", "cn-beijing", "fn-1");
        config.poll_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let config = RunnerConfig::new("ak-secret", "sk-secret", "cn-beijing", "fn-1");
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("ak-secret"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    #[serial]
    fn test_from_file_resolves_env_secrets() {
        clear_env();
        env::set_var("CODERUNNER_TEST_SK", "secret-from-env");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
function_id = "fn-sandbox"
access_key = "literal-ak"
secret_key = "env:CODERUNNER_TEST_SK"
poll_interval = "500ms"
ready_timeout = "10s"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = RunnerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.access_key, "literal-ak");
        assert_eq!(config.secret_key, "secret-from-env");
        assert_eq!(config.region, "cn-beijing");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.ready_timeout, Duration::from_secs(10));
        assert_eq!(config.logging.format, LogFormat::Json);

        env::remove_var("CODERUNNER_TEST_SK");
    }

    #[test]
    #[serial]
    fn test_from_file_missing_env_secret() {
        clear_env();
        env::remove_var("CODERUNNER_TEST_MISSING");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
function_id = "fn-sandbox"
access_key = "ak"
secret_key = "env:CODERUNNER_TEST_MISSING"
"#
        )
        .unwrap();

        assert!(matches!(
            RunnerConfig::from_file(file.path()),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var(ENV_ACCESS_KEY, "ak");
        env::set_var(ENV_SECRET_KEY, "sk");
        env::set_var(ENV_FUNCTION_ID, "fn-env");
        env::set_var(ENV_POLL_INTERVAL, "1s");

        let config = RunnerConfig::from_env().unwrap();
        assert_eq!(config.function_id, "fn-env");
        assert_eq!(config.region, "cn-beijing");
        assert_eq!(config.poll_interval, Duration::from_secs(1));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_requires_function_id() {
        clear_env();
        env::set_var(ENV_ACCESS_KEY, "ak");
        env::set_var(ENV_SECRET_KEY, "sk");

        match RunnerConfig::from_env() {
            Err(ConfigError::MissingRequired { key }) => assert_eq!(key, ENV_FUNCTION_ID),
            other => panic!("unexpected: {:?}", other),
        }

        clear_env();
    }
}
