//! Configuration loading and constants.
//!
//! Loads the list of probe specs from an optional TOML file and the
//! `HEALTHCHECK_SCRAPERS` environment variable, and defines the timing
//! constants shared by probes, the notifier and the orchestrator.
//! `AppConfig` is the root configuration struct containing all settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

// =============================================================================
// Scheduling and Timeout Constants
// =============================================================================

/// Interval used when a spec declares `scrape_interval_seconds <= 0`
pub const DEFAULT_SCRAPE_INTERVAL_SECS: u64 = 30;

/// Deadline for a single probe check, independent of the client timeout
pub const CHECK_DEADLINE_SECS: u64 = 30;

/// Client-level timeout for every outbound scrape request
pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 10;

/// Timeout for a single success notification
pub const NOTIFY_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Environment variable holding the probe list as a JSON array
pub const SCRAPERS_ENV_VAR: &str = "HEALTHCHECK_SCRAPERS";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "healthcheck=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Declarative description of one probe.
///
/// Field names on the wire match the JSON accepted in `HEALTHCHECK_SCRAPERS`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProbeSpec {
    /// Probe kind, resolved by the registry
    #[serde(rename = "healthcheck-scraper-type", alias = "kind")]
    pub kind: String,
    /// Endpoint the probe scrapes
    #[serde(rename = "scrape_url")]
    pub scrape_target: String,
    /// URL pinged after a healthy check; empty disables notification
    #[serde(rename = "ping_url", default)]
    pub notify_target: String,
    /// Seconds between checks; values <= 0 fall back to the default
    #[serde(rename = "scrape_interval_seconds", default)]
    pub interval_seconds: i64,
}

impl ProbeSpec {
    /// Effective interval in seconds (never zero)
    pub fn effective_interval(&self) -> u64 {
        if self.interval_seconds <= 0 {
            DEFAULT_SCRAPE_INTERVAL_SECS
        } else {
            self.interval_seconds as u64
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Probes to run, in declaration order
    #[serde(default)]
    pub scraper: Vec<ProbeSpec>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_scrapers = std::env::var(SCRAPERS_ENV_VAR).ok();
        Self::load_with_env(path, env_scrapers.as_deref())
    }

    /// Like [`load`](Self::load), with the JSON probe list passed in.
    pub fn load_with_env(
        path: Option<&Path>,
        env_scrapers: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let file_contents = match path {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };

        Self::from_sources(file_contents.as_deref(), env_scrapers)
    }

    /// Merge the file contents and the JSON probe list.
    ///
    /// A non-empty JSON list source replaces whatever probes the file declared.
    pub fn from_sources(
        file_contents: Option<&str>,
        env_scrapers: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config: AppConfig = match file_contents {
            Some(contents) => toml::from_str(contents)?,
            None => AppConfig::default(),
        };

        if let Some(json) = env_scrapers.filter(|s| !s.trim().is_empty()) {
            config.scraper = parse_probe_specs(json)?;
        }

        for spec in &config.scraper {
            if spec.kind.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "probe for {} has an empty kind",
                    spec.scrape_target
                )));
            }
        }

        Ok(config)
    }
}

/// Parse a JSON array of probe specs.
pub fn parse_probe_specs(json: &str) -> Result<Vec<ProbeSpec>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Json {
        var: SCRAPERS_ENV_VAR,
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to parse {var} JSON: {source}")]
    Json {
        var: &'static str,
        source: serde_json::Error,
    },
    #[error("Configuration error: {0}")]
    Validation(String),
}
