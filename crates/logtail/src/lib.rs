//! # logtail
//!
//! Durable, file-backed log tail.
//!
//! A tail appends structured [`LogEvent`]s to a single backing file and
//! answers queries by position, by minimum severity, or by first/last match
//! without keeping the sequence in memory.
//!
//! ## Features
//!
//! - **FileLogTail**: lazily opened, staleness-checked file store
//! - **InMemoryLogTail**: `Vec`-backed tail for tests and ephemeral use
//! - **LogCodec**: pluggable payload codec (postcard by default, JSON optional)
//! - **Silent degradation**: a deleted or rewritten backing file turns into
//!   empty query results, never a panic or error
//!
//! ## Example
//!
//! ```rust,no_run
//! use logtail::{FileLogTail, LogLevel, LogTail, LoggerTail};
//!
//! let tail = FileLogTail::new();
//! tail.initialize("/tmp/job.log", false);
//!
//! tail.info("starting").unwrap();
//! tail.error("failed").unwrap();
//!
//! assert_eq!(tail.get_log_event(1).unwrap().message(), "failed");
//! assert_eq!(tail.get_log_events_from(Some(LogLevel::Warn)).len(), 1);
//!
//! tail.dispose();
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod result;
pub mod store;
pub mod tail;

// Re-exports
pub use codec::{JsonCodec, LogCodec, PostcardCodec};
pub use config::TailConfig;
pub use error::TailError;
pub use event::{LogEvent, LogLevel, ParseLevelError};
pub use memory::InMemoryLogTail;
pub use result::LogEvents;
pub use store::{FileSignature, StoreHandle, StoreMode};
pub use tail::FileLogTail;

/// Read side of a log tail
///
/// Queries never fail: an unreachable or corrupted store answers `None` or
/// an empty [`LogEvents`].
pub trait LogTail: Send + Sync {
    /// Event at 0-based insertion index `index`
    fn get_log_event(&self, index: usize) -> Option<LogEvent>;

    /// Events with index in `[max(start, 0), max(start, 0) + count)`
    ///
    /// `count = None` reads to the end. Both bounds are clamped to the
    /// events that exist; a start past the end yields an empty result.
    fn get_log_events(&self, start: i64, count: Option<usize>) -> LogEvents;

    /// Events with severity at least `level`, in insertion order
    ///
    /// `None` returns every event.
    fn get_log_events_from(&self, level: Option<LogLevel>) -> LogEvents;

    /// Earliest event with severity at least `level` (`None` means any)
    fn get_first_log_event(&self, level: Option<LogLevel>) -> Option<LogEvent>;

    /// Most recent event with severity at least `level` (`None` means any)
    fn get_last_log_event(&self, level: Option<LogLevel>) -> Option<LogEvent>;

    /// Whether any event has severity at least `level`
    fn has_log_level(&self, level: LogLevel) -> bool {
        self.get_first_log_event(Some(level)).is_some()
    }

    /// Number of readable events
    fn size(&self) -> usize;
}

/// Write side of a log tail
pub trait LoggerTail: LogTail {
    /// Append one event
    ///
    /// Read-only or torn-down tails accept the call and drop the event.
    fn log_event(&self, event: LogEvent) -> Result<(), TailError>;

    /// Append an event built from `level` and `message`
    fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<(), TailError>
    where
        Self: Sized,
    {
        self.log_event(LogEvent::new(level, message))
    }

    fn trace(&self, message: impl Into<String>) -> Result<(), TailError>
    where
        Self: Sized,
    {
        self.log(LogLevel::Trace, message)
    }

    fn debug(&self, message: impl Into<String>) -> Result<(), TailError>
    where
        Self: Sized,
    {
        self.log(LogLevel::Debug, message)
    }

    fn info(&self, message: impl Into<String>) -> Result<(), TailError>
    where
        Self: Sized,
    {
        self.log(LogLevel::Info, message)
    }

    fn warn(&self, message: impl Into<String>) -> Result<(), TailError>
    where
        Self: Sized,
    {
        self.log(LogLevel::Warn, message)
    }

    fn error(&self, message: impl Into<String>) -> Result<(), TailError>
    where
        Self: Sized,
    {
        self.log(LogLevel::Error, message)
    }
}
