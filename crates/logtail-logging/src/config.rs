//! Subscriber configuration
//!
//! Every struct deserializes with `#[serde(default)]`, so a config file only
//! needs the fields it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub default_level: String,
    pub console: ConsoleConfig,
    /// Optional JSONL file sink
    pub file: Option<FileConfig>,
    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Debug-level, colored, human-readable output on stderr
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
                target: ConsoleTarget::Stderr,
            },
            ..Default::default()
        }
    }

    /// Long-running process writing daily JSONL files under `log_dir`, no console
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            console: ConsoleConfig {
                enabled: false,
                ..Default::default()
            },
            file: Some(FileConfig {
                directory: log_dir,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Command-line tools: stdout carries results, so diagnostics go to stderr
    ///
    /// Quiet (warnings only, plain text) unless `verbose`.
    pub fn cli(verbose: bool) -> Self {
        if verbose {
            return Self::development();
        }
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: false,
                target: ConsoleTarget::Stderr,
            },
            ..Default::default()
        }
    }

    /// Parse JSON, taking defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Stream the console layer writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Human-readable lines instead of JSONL
    pub pretty: bool,
    /// ANSI colors (pretty output only)
    pub ansi: bool,
    pub target: ConsoleTarget,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false,
            ansi: false,
            target: ConsoleTarget::Stdout,
        }
    }
}

/// JSONL file sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; rotated files get a date suffix
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "logtail".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

/// When the file sink starts a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// Single `<prefix>.log`, truncated at startup
    Never,
}

/// Shape of JSONL records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Put event fields at the top level instead of under `fields`
    pub flatten_events: bool,
    pub include_spans: bool,
    /// Source file and line number
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_location: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_write_jsonl_to_stdout() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(config.console.enabled);
        assert!(!config.console.pretty);
        assert_eq!(config.console.target, ConsoleTarget::Stdout);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_cli_keeps_stdout_clean() {
        let quiet = LogConfig::cli(false);
        assert_eq!(quiet.default_level, "warn");
        assert_eq!(quiet.console.target, ConsoleTarget::Stderr);
        assert!(!quiet.console.ansi);

        let verbose = LogConfig::cli(true);
        assert_eq!(verbose.default_level, "debug");
        assert_eq!(verbose.console.target, ConsoleTarget::Stderr);
        assert!(verbose.console.pretty);
    }

    #[test]
    fn test_production_is_file_only() {
        let config = LogConfig::production(PathBuf::from("/srv/job/logs"));
        assert!(!config.console.enabled);
        let file = config.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/srv/job/logs"));
        assert_eq!(file.prefix, "logtail");
        assert_eq!(file.rotation, RotationStrategy::Daily);
    }

    #[test]
    fn test_json_overrides_only_named_fields() {
        let config = LogConfig::from_json(
            r#"{"default_level": "logtail=trace", "console": {"target": "stderr"}}"#,
        )
        .unwrap();
        assert_eq!(config.default_level, "logtail=trace");
        assert_eq!(config.console.target, ConsoleTarget::Stderr);
        assert!(config.console.enabled);
        assert!(!config.console.pretty);
        assert!(config.jsonl.flatten_events);
    }
}
