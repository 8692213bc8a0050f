//! Logging configuration
//!
//! Loaded from JSON by the simulator CLI; every field is optional.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::LogError;

/// What the subscriber writes where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Console output
    pub console: ConsoleOutput,
    /// JSONL trace file, if any
    pub file: Option<FileConfig>,
    /// Attach the span stack (and with it the node being driven) to JSONL lines
    pub with_spans: bool,
    /// Attach source file and line to JSONL lines
    pub with_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleOutput::Jsonl,
            file: None,
            with_spans: true,
            with_location: true,
        }
    }
}

impl LogConfig {
    /// Verbose, colored console output
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleOutput::Pretty { ansi: true },
            ..Default::default()
        }
    }

    /// Readable console summary plus a per-run JSONL trace in `log_dir`
    ///
    /// The trace file is truncated at startup.
    pub fn simulation(log_dir: PathBuf) -> Self {
        Self {
            console: ConsoleOutput::Pretty { ansi: false },
            file: Some(FileConfig {
                directory: log_dir,
                prefix: "ferry-sim".to_string(),
                rotation: FileRotation::PerRun,
                max_files: None,
            }),
            ..Default::default()
        }
    }

    /// Warnings only
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            console: ConsoleOutput::Pretty { ansi: false },
            with_location: false,
            ..Default::default()
        }
    }

    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, LogError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleOutput {
    /// Nothing on the console
    Off,
    /// One JSON object per line
    #[default]
    Jsonl,
    /// Human-readable lines
    Pretty { ansi: bool },
}

/// JSONL trace file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; files end in `.log`
    pub prefix: String,
    pub rotation: FileRotation,
    /// Rotated files kept on disk (rotating strategies only)
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "ferry".to_string(),
            rotation: FileRotation::Daily,
            max_files: Some(7),
        }
    }
}

/// When a new trace file is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRotation {
    #[default]
    Daily,
    Hourly,
    /// A single `<prefix>.log`, truncated by every run
    PerRun,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_jsonl_console() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.console, ConsoleOutput::Jsonl);
        assert!(config.file.is_none());
        assert!(config.with_spans);
    }

    #[test]
    fn test_simulation_writes_per_run_trace() {
        let config = LogConfig::simulation(PathBuf::from("/tmp/ferry"));
        let file = config.file.unwrap();
        assert_eq!(file.rotation, FileRotation::PerRun);
        assert_eq!(file.directory, PathBuf::from("/tmp/ferry"));
        assert_eq!(config.console, ConsoleOutput::Pretty { ansi: false });
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LogConfig::from_json(r#"{ "level": "ferry_dtn=trace" }"#).unwrap();
        assert_eq!(config.level, "ferry_dtn=trace");
        assert_eq!(config.console, ConsoleOutput::Jsonl);
        assert!(config.with_location);
    }

    #[test]
    fn test_json_console_and_file() {
        let json = r#"{
            "console": { "pretty": { "ansi": true } },
            "file": { "directory": "/var/log/ferry", "rotation": "hourly" },
            "with_spans": false
        }"#;
        let config = LogConfig::from_json(json).unwrap();
        assert_eq!(config.console, ConsoleOutput::Pretty { ansi: true });
        assert!(!config.with_spans);
        let file = config.file.unwrap();
        assert_eq!(file.rotation, FileRotation::Hourly);
        assert_eq!(file.prefix, "ferry");
    }

    #[test]
    fn test_console_off_from_json() {
        let config = LogConfig::from_json(r#"{ "console": "off" }"#).unwrap();
        assert_eq!(config.console, ConsoleOutput::Off);
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            LogConfig::from_json("{ not json"),
            Err(LogError::Config(_))
        ));
    }
}
