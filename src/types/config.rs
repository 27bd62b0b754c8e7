//! Configuration structures.
//!
//! Configuration is loaded from an optional JSON file named by `PYUSDT_CONFIG`
//! and then overridden by environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::errors::{Error, Result};

/// Environment variable naming a JSON config file.
pub const ENV_CONFIG_FILE: &str = "PYUSDT_CONFIG";
/// Environment variable overriding the monitoring tool name.
pub const ENV_TOOL_NAME: &str = "PYUSDT_TOOL_NAME";
/// Environment variable holding the log filter directive.
pub const ENV_LOG_FILTER: &str = "PYUSDT_LOG";
/// Environment variable selecting the log format (`json` or `compact`).
pub const ENV_LOG_FORMAT: &str = "PYUSDT_LOG_FORMAT";

/// Global bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Name claimed for the profiler tool id.
    #[serde(default = "default_tool_name")]
    pub tool_name: String,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_tool_name() -> String {
    "pyusdt-profiling".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_name: default_tool_name(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive. Kept at `warn` by default so the monitored
    /// program's stderr only carries the load and enable lines.
    pub log_filter: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };

        if let Some(name) = lookup(ENV_TOOL_NAME) {
            config.tool_name = name;
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            config.observability.log_filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            config.observability.json_logs = match format.to_ascii_lowercase().as_str() {
                "json" => true,
                "compact" | "text" | "" => false,
                other => {
                    return Err(Error::config(format!(
                        "{ENV_LOG_FORMAT} must be `json` or `compact`, got `{other}`"
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tool_name.trim().is_empty() {
            return Err(Error::config("tool_name must not be empty"));
        }
        Ok(())
    }
}
