//! Logging setup for logtail
//!
//! Configures the global `tracing` subscriber for binaries built on the
//! `logtail` crate.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines on the console (default)
//! - **Pretty Output**: Human-readable console output for development
//! - **Console Target**: stdout or stderr, so tools can keep stdout for data
//! - **File Output**: Daily/hourly/no rotation via tracing-appender
//! - **Tail Mirroring**: [`TailLayer`] appends every event to a log tail
//!
//! # Quick Start
//!
//! ```ignore
//! use logtail_logging::{LogConfig, LogtailSubscriberBuilder};
//!
//! // JSONL to stdout
//! LogtailSubscriberBuilder::new().init();
//!
//! // Pretty output on stderr, and keep warnings in a queryable tail
//! let tail = std::sync::Arc::new(logtail::FileLogTail::new());
//! tail.initialize("/var/lib/app/diagnostics.tail", false);
//! let _guard = LogtailSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .with_tail(tail, logtail::LogLevel::Warn)
//!     .init();
//! ```

pub mod config;
pub mod layers;

pub use config::{ConsoleConfig, ConsoleTarget, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use layers::{TailLayer, tail_level};

use std::fs::{self, File};
use std::sync::Arc;

use logtail::{LogLevel, LoggerTail};
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory or file could not be created
    #[error("I/O error: {0}")]
    Io(String),

    /// A global subscriber is already installed
    #[error("Subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

impl From<std::io::Error> for LoggingError {
    fn from(err: std::io::Error) -> Self {
        LoggingError::Io(err.to_string())
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Builder for configuring and initializing the logtail subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct LogtailSubscriberBuilder {
    config: LogConfig,
    tail: Option<(Arc<dyn LoggerTail>, LogLevel)>,
}

impl LogtailSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
            tail: None,
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Mirror events at or above `min_level` into `tail`
    pub fn with_tail(mut self, tail: Arc<dyn LoggerTail>, min_level: LogLevel) -> Self {
        self.tail = Some((tail, min_level));
        self
    }

    fn file_writer(file_config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
        fs::create_dir_all(&file_config.directory)?;
        let writer = match file_config.rotation {
            RotationStrategy::Never => {
                let path = file_config.directory.join(format!("{}.log", file_config.prefix));
                tracing_appender::non_blocking(File::create(path)?)
            }
            RotationStrategy::Daily => tracing_appender::non_blocking(RollingFileAppender::new(
                Rotation::DAILY,
                &file_config.directory,
                &file_config.prefix,
            )),
            RotationStrategy::Hourly => tracing_appender::non_blocking(RollingFileAppender::new(
                Rotation::HOURLY,
                &file_config.directory,
                &file_config.prefix,
            )),
        };
        Ok(writer)
    }

    fn layers(&self) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>), LoggingError> {
        let jsonl = &self.config.jsonl;
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            let console = &self.config.console;
            let writer = match console.target {
                ConsoleTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
                ConsoleTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
            };
            if console.pretty {
                layers.push(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(console.ansi)
                        .with_target(true)
                        .with_writer(writer)
                        .boxed(),
                );
            } else {
                layers.push(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(jsonl.include_spans)
                        .flatten_event(jsonl.flatten_events)
                        .with_file(jsonl.include_location)
                        .with_line_number(jsonl.include_location)
                        .with_writer(writer)
                        .boxed(),
                );
            }
        }

        if let Some(file_config) = &self.config.file {
            let (non_blocking, file_guard) = Self::file_writer(file_config)?;
            guard = Some(file_guard);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(jsonl.include_spans)
                    .flatten_event(jsonl.flatten_events)
                    .with_file(jsonl.include_location)
                    .with_line_number(jsonl.include_location)
                    .with_writer(non_blocking)
                    .boxed(),
            );
        }

        if let Some((tail, min_level)) = &self.tail {
            layers.push(
                TailLayer::new(Arc::clone(tail))
                    .with_min_level(*min_level)
                    .boxed(),
            );
        }

        Ok((layers, guard))
    }

    /// Try to initialize the subscriber globally
    ///
    /// Returns the file writer guard, which must be kept alive for the
    /// duration of the program when file output is enabled.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let (layers, guard) = self.layers()?;

        Registry::default()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }

    /// Initialize the subscriber globally, reporting failures on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }
}

impl Default for LogtailSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}
