//! In-memory log tail
//!
//! Suitable for tests and for callers that only need the query algebra for
//! the lifetime of the process.

use parking_lot::RwLock;
use tracing::trace;

use crate::error::TailError;
use crate::event::{LogEvent, LogLevel};
use crate::result::{LogEvents, range_bounds};
use crate::{LogTail, LoggerTail};

/// `Vec`-backed implementation of [`LogTail`] and [`LoggerTail`]
#[derive(Debug, Default)]
pub struct InMemoryLogTail {
    events: RwLock<Vec<LogEvent>>,
}

impl InMemoryLogTail {
    /// Create an empty tail
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every event
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl FromIterator<LogEvent> for InMemoryLogTail {
    fn from_iter<T: IntoIterator<Item = LogEvent>>(iter: T) -> Self {
        Self {
            events: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl LogTail for InMemoryLogTail {
    fn get_log_event(&self, index: usize) -> Option<LogEvent> {
        self.events.read().get(index).cloned()
    }

    fn get_log_events(&self, start: i64, count: Option<usize>) -> LogEvents {
        let events = self.events.read();
        let (start, end) = range_bounds(start, count, events.len());
        LogEvents::new(events[start..end].to_vec())
    }

    fn get_log_events_from(&self, level: Option<LogLevel>) -> LogEvents {
        let threshold = level.unwrap_or(LogLevel::Trace);
        self.events
            .read()
            .iter()
            .filter(|e| e.level().meets(threshold))
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }

    fn get_first_log_event(&self, level: Option<LogLevel>) -> Option<LogEvent> {
        let threshold = level.unwrap_or(LogLevel::Trace);
        self.events
            .read()
            .iter()
            .find(|e| e.level().meets(threshold))
            .cloned()
    }

    fn get_last_log_event(&self, level: Option<LogLevel>) -> Option<LogEvent> {
        let threshold = level.unwrap_or(LogLevel::Trace);
        self.events
            .read()
            .iter()
            .rev()
            .find(|e| e.level().meets(threshold))
            .cloned()
    }

    fn size(&self) -> usize {
        self.events.read().len()
    }
}

impl LoggerTail for InMemoryLogTail {
    fn log_event(&self, event: LogEvent) -> Result<(), TailError> {
        let mut events = self.events.write();
        trace!(index = events.len(), level = %event.level(), "Appended log event");
        events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(events: &LogEvents) -> Vec<&str> {
        events.iter().map(|e| e.message()).collect()
    }

    #[test]
    fn test_append_and_index() {
        let tail = InMemoryLogTail::new();
        tail.error("error0").unwrap();
        tail.error("error1").unwrap();

        assert_eq!(tail.get_log_event(0).unwrap().message(), "error0");
        assert_eq!(tail.get_log_event(1).unwrap().message(), "error1");
        assert!(tail.get_log_event(2).is_none());
        assert_eq!(tail.size(), 2);
    }

    #[test]
    fn test_threshold_queries() {
        let tail: InMemoryLogTail = [
            LogEvent::new(LogLevel::Info, "info0"),
            LogEvent::new(LogLevel::Warn, "warn0"),
            LogEvent::new(LogLevel::Error, "error0"),
            LogEvent::new(LogLevel::Info, "info1"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            messages(&tail.get_log_events_from(Some(LogLevel::Warn))),
            vec!["warn0", "error0"]
        );
        assert_eq!(tail.get_log_events_from(None).len(), 4);
        assert_eq!(
            tail.get_first_log_event(Some(LogLevel::Warn)).unwrap().message(),
            "warn0"
        );
        assert_eq!(tail.get_last_log_event(None).unwrap().message(), "info1");
        assert!(tail.get_last_log_event(Some(LogLevel::Error)).is_some());
    }

    #[test]
    fn test_range_query_and_clear() {
        let tail = InMemoryLogTail::new();
        for i in 0..5 {
            tail.info(format!("info{}", i)).unwrap();
        }

        assert_eq!(messages(&tail.get_log_events(3, None)), vec!["info3", "info4"]);
        assert_eq!(messages(&tail.get_log_events(-2, Some(1))), vec!["info0"]);
        assert!(tail.get_log_events(9, None).is_empty());

        tail.clear();
        assert_eq!(tail.size(), 0);
        assert!(tail.get_first_log_event(None).is_none());
    }
}
