//! Configuration module for sharesync.
//!
//! Typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for sharesync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
}

/// SQLite persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

/// Cron scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between tick checks against the in-memory trigger table.
    pub tick_interval_secs: u64,
    /// Maximum sync runs allowed to execute concurrently across all configs.
    pub max_concurrent_runs: u32,
}

/// Cross-provider defaults applied by C1/C2 unless a `SyncConfig` overrides
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Per-call timeout in seconds (spec recommends 30).
    pub call_timeout_secs: u64,
    /// Transient-error retry attempts at the client layer (spec recommends 3).
    pub retry_attempts: u32,
    /// Base delay in seconds for the retry backoff schedule.
    pub retry_base_delay_secs: u64,
    /// Minimum pause in seconds before each descent in `slow` recursion
    /// (spec requires >= 3).
    pub slow_recursion_pause_secs: u64,
    /// Drive-manager idle eviction threshold, in seconds (default 1800).
    pub client_max_idle_secs: u64,
    /// Drive-manager sweep throttle, in seconds (default 3600).
    pub client_cleanup_interval_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON-formatted log lines instead of human-readable ones.
    pub json: bool,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/sharesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("sharesync")
            .join("config.yaml")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("sharesync")
                .join("sharesync.db"),
            max_connections: 5,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 10,
            max_concurrent_runs: 4,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            retry_attempts: 3,
            retry_base_delay_secs: 1,
            slow_recursion_pause_secs: 3,
            client_max_idle_secs: 1800,
            client_cleanup_interval_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"scheduler.tick_interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.database.max_connections == 0 {
            errors.push(ValidationError {
                field: "database.max_connections".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.scheduler.tick_interval_secs == 0 {
            errors.push(ValidationError {
                field: "scheduler.tick_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.scheduler.max_concurrent_runs == 0 {
            errors.push(ValidationError {
                field: "scheduler.max_concurrent_runs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.providers.call_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "providers.call_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.providers.slow_recursion_pause_secs < 3 {
            errors.push(ValidationError {
                field: "providers.slow_recursion_pause_secs".into(),
                message: "must be at least 3 seconds".into(),
            });
        }
        if self.providers.client_max_idle_secs == 0 {
            errors.push(ValidationError {
                field: "providers.client_max_idle_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.providers.client_cleanup_interval_secs == 0 {
            errors.push(ValidationError {
                field: "providers.client_cleanup_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    pub fn database_max_connections(mut self, n: u32) -> Self {
        self.config.database.max_connections = n;
        self
    }

    pub fn scheduler_tick_interval_secs(mut self, secs: u64) -> Self {
        self.config.scheduler.tick_interval_secs = secs;
        self
    }

    pub fn scheduler_max_concurrent_runs(mut self, n: u32) -> Self {
        self.config.scheduler.max_concurrent_runs = n;
        self
    }

    pub fn providers_call_timeout_secs(mut self, secs: u64) -> Self {
        self.config.providers.call_timeout_secs = secs;
        self
    }

    pub fn providers_retry_attempts(mut self, n: u32) -> Self {
        self.config.providers.retry_attempts = n;
        self
    }

    pub fn providers_slow_recursion_pause_secs(mut self, secs: u64) -> Self {
        self.config.providers.slow_recursion_pause_secs = secs;
        self
    }

    pub fn providers_client_max_idle_secs(mut self, secs: u64) -> Self {
        self.config.providers.client_max_idle_secs = secs;
        self
    }

    pub fn providers_client_cleanup_interval_secs(mut self, secs: u64) -> Self {
        self.config.providers.client_cleanup_interval_secs = secs;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.scheduler.max_concurrent_runs, 4);
        assert_eq!(cfg.providers.call_timeout_secs, 30);
        assert_eq!(cfg.providers.retry_attempts, 3);
        assert_eq!(cfg.providers.slow_recursion_pause_secs, 3);
        assert_eq!(cfg.providers.client_max_idle_secs, 1800);
        assert_eq!(cfg.providers.client_cleanup_interval_secs, 3600);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
database:
  path: /tmp/test-sharesync.db
  max_connections: 10
scheduler:
  tick_interval_secs: 5
  max_concurrent_runs: 8
providers:
  call_timeout_secs: 15
  retry_attempts: 5
  retry_base_delay_secs: 2
  slow_recursion_pause_secs: 4
  client_max_idle_secs: 900
  client_cleanup_interval_secs: 1800
logging:
  level: debug
  json: true
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/test-sharesync.db"));
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.scheduler.tick_interval_secs, 5);
        assert_eq!(cfg.providers.retry_attempts, 5);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.scheduler.max_concurrent_runs, 4);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn validate_catches_slow_pause_below_minimum() {
        let mut cfg = Config::default();
        cfg.providers.slow_recursion_pause_secs = 1;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "providers.slow_recursion_pause_secs"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .database_path(PathBuf::from("/custom/db.sqlite"))
            .database_max_connections(20)
            .scheduler_tick_interval_secs(30)
            .scheduler_max_concurrent_runs(2)
            .providers_call_timeout_secs(60)
            .providers_retry_attempts(5)
            .providers_slow_recursion_pause_secs(5)
            .providers_client_max_idle_secs(600)
            .providers_client_cleanup_interval_secs(1200)
            .logging_level("warn")
            .logging_json(true)
            .build();

        assert_eq!(cfg.database.path, PathBuf::from("/custom/db.sqlite"));
        assert_eq!(cfg.database.max_connections, 20);
        assert_eq!(cfg.scheduler.tick_interval_secs, 30);
        assert_eq!(cfg.scheduler.max_concurrent_runs, 2);
        assert_eq!(cfg.providers.call_timeout_secs, 60);
        assert_eq!(cfg.providers.retry_attempts, 5);
        assert_eq!(cfg.logging.level, "warn");
        assert!(cfg.logging.json);
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new()
            .scheduler_tick_interval_secs(0)
            .logging_level("nope")
            .build_validated();
        assert!(result.is_err());
        assert!(result.unwrap_err().len() >= 2);
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        let p = Config::default_path();
        assert!(p.ends_with("sharesync/config.yaml"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "scheduler.tick_interval_secs".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "scheduler.tick_interval_secs: must be greater than 0"
        );
    }
}
