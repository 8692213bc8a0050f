//! Multi-node JSONL logging for Ferry
//!
//! A simulation run drives many routers in one process, so every log line
//! needs to say which node produced it. This crate wires up a
//! `tracing-subscriber` registry for that.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log analysis (default)
//! - **Node Context Injection**: Spans remember which node was being driven
//! - **Trace Files**: per-run, daily or hourly files via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use ferry_logging::{FerrySubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! FerrySubscriberBuilder::new().init()?;
//!
//! // Development mode with pretty human-readable output
//! FerrySubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init()?;
//! ```
//!
//! # Node Context
//!
//! ```ignore
//! use ferry_logging::NodeContextGuard;
//! use ferry_core::SimulationIdentity;
//!
//! let node = SimulationIdentity::new('A').unwrap();
//! let _guard = NodeContextGuard::new(&node);
//! tracing::info!("Forwarding bundle");
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleOutput, FileConfig, FileRotation, LogConfig};
pub use context::{NodeContextData, NodeContextGuard};
pub use layers::{NodeContextLayer, jsonl_layer, node_context_of};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while setting up logging
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot create rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("invalid log configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Builder for configuring and initializing the Ferry logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct FerrySubscriberBuilder {
    config: LogConfig,
}

impl FerrySubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the filter directive used when `RUST_LOG` is unset
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Choose the console format
    pub fn with_console(mut self, console: ConsoleOutput) -> Self {
        self.config.console = console;
        self
    }

    /// Also write a JSONL trace file
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Install the subscriber globally
    ///
    /// With file output the returned guard must be kept alive for the rest of
    /// the program, or buffered lines are lost.
    pub fn init(self) -> Result<Option<WorkerGuard>, LogError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.level));

        let registry = Registry::default()
            .with(env_filter)
            .with(NodeContextLayer::new());

        let config = &self.config;
        let file = config.file.as_ref().map(file_writer).transpose()?;

        // One arm per combination keeps the layer types concrete
        let guard = match (config.console, file) {
            (ConsoleOutput::Pretty { ansi }, Some((writer, guard))) => {
                registry
                    .with(pretty_layer(ansi))
                    .with(jsonl_layer(config, writer))
                    .try_init()?;
                Some(guard)
            }
            (ConsoleOutput::Jsonl, Some((writer, guard))) => {
                registry
                    .with(jsonl_layer(config, std::io::stdout))
                    .with(jsonl_layer(config, writer))
                    .try_init()?;
                Some(guard)
            }
            (ConsoleOutput::Off, Some((writer, guard))) => {
                registry.with(jsonl_layer(config, writer)).try_init()?;
                Some(guard)
            }
            (ConsoleOutput::Pretty { ansi }, None) => {
                registry.with(pretty_layer(ansi)).try_init()?;
                None
            }
            (ConsoleOutput::Jsonl, None) => {
                registry.with(jsonl_layer(config, std::io::stdout)).try_init()?;
                None
            }
            (ConsoleOutput::Off, None) => {
                registry.try_init()?;
                None
            }
        };

        Ok(guard)
    }
}

fn pretty_layer<S>(ansi: bool) -> tracing_subscriber::fmt::Layer<S>
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
}

impl Default for FerrySubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the non-blocking writer for file output
///
/// `PerRun` truncates a single file; the rotating strategies append.
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let rotation = match config.rotation {
        FileRotation::PerRun => {
            fs::create_dir_all(&config.directory)?;
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        FileRotation::Daily => Rotation::DAILY,
        FileRotation::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log");
    if let Some(max) = config.max_files {
        builder = builder.max_log_files(max);
    }
    let appender = builder.build(&config.directory)?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> Result<(), LogError> {
    FerrySubscriberBuilder::new().init().map(|_| ())
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<(), LogError> {
    FerrySubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
        .map(|_| ())
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_testing() {
    let _ = FerrySubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_jsonl() {
        let builder = FerrySubscriberBuilder::new();
        assert_eq!(builder.config.level, "info");
        assert_eq!(builder.config.console, ConsoleOutput::Jsonl);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = FerrySubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config.level, "debug");
        assert_eq!(builder.config.console, ConsoleOutput::Pretty { ansi: true });
    }

    #[test]
    fn test_builder_with_level_and_console() {
        let builder = FerrySubscriberBuilder::new()
            .with_level("trace")
            .with_console(ConsoleOutput::Off);
        assert_eq!(builder.config.level, "trace");
        assert_eq!(builder.config.console, ConsoleOutput::Off);
    }

    #[test]
    fn test_builder_with_file_output() {
        let builder = FerrySubscriberBuilder::new().with_file_output(FileConfig::default());
        assert_eq!(builder.config.file.unwrap().prefix, "ferry");
    }

    #[test]
    fn test_per_run_file_is_truncated() {
        let dir = std::env::temp_dir().join(format!("ferry-logging-{}", uuid::Uuid::new_v4()));
        let config = FileConfig {
            directory: dir.clone(),
            prefix: "run".to_string(),
            rotation: FileRotation::PerRun,
            max_files: None,
        };
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("run.log"), b"stale").unwrap();

        let (_writer, guard) = file_writer(&config).unwrap();
        drop(guard);

        assert_eq!(fs::read(dir.join("run.log")).unwrap().len(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_init_testing_is_idempotent() {
        init_testing();
        init_testing();
    }
}
