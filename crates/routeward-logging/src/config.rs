//! Configuration types for the logging system
//!
//! All types deserialize with defaults for missing keys, so a service can
//! embed a partial `[logging]` table in its own config file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level (overridden by RUST_LOG)
    pub default_level: String,

    /// Extra filter directives, e.g. `routeward_reconcile=debug`
    pub directives: Vec<String>,

    /// Console output
    pub console: ConsoleConfig,

    /// JSONL file output, off unless set
    pub file: Option<FileConfig>,

    /// Fields attached to every JSONL line
    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            directives: Vec::new(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Verbose, colored console output
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig {
                format: ConsoleFormat::Pretty,
                ansi: true,
                ..ConsoleConfig::default()
            },
            ..Default::default()
        }
    }

    /// Daily JSONL files under `log_dir`, a month retained, no console
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            console: ConsoleConfig {
                enabled: false,
                ..ConsoleConfig::default()
            },
            file: Some(FileConfig {
                directory: log_dir,
                rotation: RotationStrategy::Daily { retain: Some(30) },
                ..FileConfig::default()
            }),
            ..Default::default()
        }
    }

    /// Warnings only, captured per test by the test harness
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                format: ConsoleFormat::Pretty,
                capture: true,
                ..ConsoleConfig::default()
            },
            ..Default::default()
        }
    }

    /// Add a filter directive
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }
}

/// How console lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable lines
    Pretty,
}

/// Console output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: ConsoleFormat,
    /// Colors, pretty format only
    pub ansi: bool,
    /// Write through the test harness so output is captured per test
    pub capture: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Json,
            ansi: false,
            capture: false,
        }
    }
}

/// JSONL file output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory for log files, created if missing
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "routeward".to_string(),
            rotation: RotationStrategy::default(),
        }
    }
}

/// File rotation strategy
///
/// `retain` bounds how many rotated files are kept; `None` keeps them all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    Daily { retain: Option<usize> },
    Hourly { retain: Option<usize> },
    /// A single `<prefix>.log`, truncated on start
    Never,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::Daily { retain: Some(7) }
    }
}

/// JSONL line contents
///
/// Event fields are always flattened to the top level so lines can be
/// filtered on `route_table_id` and `destination` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Include the list of entered spans
    pub include_spans: bool,
    /// Include source file and line
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            include_spans: true,
            include_location: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(config.console.enabled);
        assert_eq!(config.console.format, ConsoleFormat::Json);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.default_level, "debug");
        assert_eq!(config.console.format, ConsoleFormat::Pretty);
        assert!(config.console.ansi);
    }

    #[test]
    fn test_production_config() {
        let config = LogConfig::production(PathBuf::from("/var/log/routeward"));
        assert!(!config.console.enabled);
        let file = config.file.unwrap();
        assert_eq!(file.prefix, "routeward");
        assert_eq!(file.rotation, RotationStrategy::Daily { retain: Some(30) });
    }

    #[test]
    fn test_testing_config_captures_output() {
        let config = LogConfig::testing().with_directive("routeward_reconcile=debug");
        assert!(config.console.capture);
        assert_eq!(config.directives, vec!["routeward_reconcile=debug"]);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: LogConfig = serde_json::from_str(
            r#"{
                "default_level": "debug",
                "console": {"format": "pretty"},
                "file": {"directory": "/tmp/rw", "rotation": {"hourly": {"retain": 24}}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.default_level, "debug");
        assert_eq!(config.console.format, ConsoleFormat::Pretty);
        let file = config.file.unwrap();
        assert_eq!(file.rotation, RotationStrategy::Hourly { retain: Some(24) });
        assert_eq!(file.prefix, "routeward");
    }

    #[test]
    fn test_never_rotation_deserializes_as_unit() {
        let file: FileConfig = serde_json::from_str(r#"{"rotation": "never"}"#).unwrap();
        assert_eq!(file.rotation, RotationStrategy::Never);
    }
}
