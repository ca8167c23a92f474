//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use kgem_framework::CommandDefaults;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KgemConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

// =============================================================================
// Managers
// =============================================================================

/// Settings of the root command manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Whether the root command manager starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prefix characters used by commands registered without their own.
    #[serde(default = "default_prefixes")]
    pub default_prefixes: String,

    /// Whether commands are owner-only unless they say otherwise.
    #[serde(default = "default_true")]
    pub owner_only: bool,

    /// Diagnostic label of the root manager.
    #[serde(default)]
    pub label: Option<String>,

    /// Upper bound for one command dispatch in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_prefixes: default_prefixes(),
            owner_only: true,
            label: None,
            timeout_ms: None,
        }
    }
}

impl CommandsConfig {
    /// Registration defaults for the root command manager.
    pub fn defaults(&self) -> CommandDefaults {
        CommandDefaults {
            prefixes: self.default_prefixes.chars().map(String::from).collect(),
            owner_only: self.owner_only,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Settings of the root event manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub label: Option<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            label: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_prefixes() -> String {
    ".".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in every line.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in every line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files to keep. `0` keeps all of them.
    #[serde(default = "default_max_files")]
    pub max_files: u32,

    /// Per-target levels, e.g. `kgem_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_files() -> u32 {
    5
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file is rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
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

    #[test]
    fn test_command_defaults_split_prefix_chars() {
        let config = CommandsConfig {
            default_prefixes: "./".into(),
            owner_only: false,
            ..Default::default()
        };
        let defaults = config.defaults();
        assert_eq!(defaults.prefixes, vec![".".to_string(), "/".to_string()]);
        assert!(!defaults.owner_only);
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let level = figment::Figment::from(figment::providers::Serialized::default("level", "verbose"))
            .extract_inner::<LogLevel>("level");
        assert!(level.is_err());

        let level = figment::Figment::from(figment::providers::Serialized::default("level", "warn"))
            .extract_inner::<LogLevel>("level")
            .unwrap();
        assert_eq!(level, LogLevel::Warn);
    }
}
