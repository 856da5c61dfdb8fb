//! Custom tracing layers
//!
//! [`TailLayer`] mirrors every tracing event into a [`LoggerTail`], so a
//! process can keep a durable, queryable record of its own diagnostics.

use std::cell::Cell;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use logtail::{LogEvent, LogLevel, LoggerTail};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

thread_local! {
    /// Set while this thread is inside `LoggerTail::log_event`
    static IN_TAIL: Cell<bool> = const { Cell::new(false) };
}

/// Layer that appends each event to a log tail
pub struct TailLayer {
    tail: Arc<dyn LoggerTail>,
    min_level: LogLevel,
}

impl TailLayer {
    /// Mirror events of every level into `tail`
    pub fn new(tail: Arc<dyn LoggerTail>) -> Self {
        Self {
            tail,
            min_level: LogLevel::Trace,
        }
    }

    /// Only mirror events at or above `level`
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }
}

/// Map a tracing level onto the tail's severity scale
pub fn tail_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Events from the tail itself are never mirrored back into it
fn is_tail_internal(target: &str) -> bool {
    target == "logtail" || target.starts_with("logtail::")
}

impl<S> Layer<S> for TailLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = tail_level(metadata.level());
        if !level.meets(self.min_level) || is_tail_internal(metadata.target()) {
            return;
        }
        if IN_TAIL.with(|flag| flag.replace(true)) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let cause = visitor.error.take();
        let mut log_event = LogEvent::new(level, visitor.render(metadata.target()));
        if let Some(cause) = cause {
            log_event = log_event.with_cause(cause);
        }

        if let Err(e) = self.tail.log_event(log_event) {
            eprintln!("Warning: failed to mirror event into log tail: {}", e);
        }
        IN_TAIL.with(|flag| flag.set(false));
    }
}

/// Collects the message, an `error` field and the remaining fields
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    error: Option<String>,
    fields: String,
}

impl EventVisitor {
    fn render(self, target: &str) -> String {
        let mut out = format!("[{}] ", target);
        out.push_str(self.message.as_deref().unwrap_or_default());
        out.push_str(&self.fields);
        out
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "error" => self.error = Some(value.to_string()),
            name => {
                let _ = write!(self.fields, " {}={}", name, value);
            }
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if field.name() == "error" {
            self.error = Some(value.to_string());
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "error" => self.error = Some(format!("{:?}", value)),
            name => {
                let _ = write!(self.fields, " {}={:?}", name, value);
            }
        }
    }
}
