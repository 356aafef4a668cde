//! Configuration schema definitions.
//!
//! ```toml
//! adapters = ["shell"]
//!
//! [bot]
//! name = "hubot"
//! alias = "/"
//!
//! [adapter.shell]
//! user = "me"
//!
//! [plugins.ping]
//! greeting = "PONG"
//!
//! [settings]
//! deploy.default_env = "staging"
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SwitchboardConfig {
    /// Identity of the robot.
    #[serde(default)]
    pub bot: BotConfig,

    /// Names of the adapters to load, in order.
    #[serde(default)]
    pub adapters: Vec<String>,

    /// Per-adapter configuration sections, keyed by adapter name.
    #[serde(default)]
    pub adapter: HashMap<String, Value>,

    /// Per-plugin configuration sections, keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, Value>,

    /// Free-form settings exposed through the configuration lookup service.
    #[serde(default)]
    pub settings: Map<String, Value>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SwitchboardConfig {
    /// Returns the configuration section of adapter `name`.
    pub fn adapter_config(&self, name: &str) -> Option<&Value> {
        self.adapter.get(name)
    }

    /// Returns the configuration section of plugin `name`, or an empty object.
    pub fn plugin_config(&self, name: &str) -> Value {
        self.plugins
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Identity of the robot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotConfig {
    /// The name the robot answers to in `respond` listeners.
    #[serde(default)]
    pub name: String,

    /// An alternative prefix, e.g. `/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, required when `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Rotation policy for file output.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module level overrides, e.g. `switchboard_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_document() {
        let config: SwitchboardConfig = serde_json::from_value(json!({
            "bot": { "name": "hubot", "alias": "/" },
            "adapters": ["shell"],
            "adapter": { "shell": { "user": "me" } },
            "plugins": { "ping": { "greeting": "PONG" } },
            "settings": { "deploy": { "default_env": "staging" } },
            "logging": {
                "level": "debug",
                "format": "pretty",
                "filters": { "switchboard_framework": "trace" }
            },
        }))
        .unwrap();

        assert_eq!(config.bot.alias.as_deref(), Some("/"));
        assert_eq!(config.adapter_config("shell"), Some(&json!({ "user": "me" })));
        assert_eq!(config.plugin_config("ping"), json!({ "greeting": "PONG" }));
        assert_eq!(config.plugin_config("missing"), json!({}));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filters["switchboard_framework"], LogLevel::Trace);
    }

    #[test]
    fn test_defaults() {
        let config: SwitchboardConfig = serde_json::from_value(json!({})).unwrap();

        assert!(config.bot.name.is_empty());
        assert!(config.adapters.is_empty());
        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert_eq!(config.logging.rotation, LogRotation::Never);
    }
}
