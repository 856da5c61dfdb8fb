//! Query results

use std::slice;
use std::vec;

use crate::event::LogEvent;

/// Ordered, immutable list of events returned by range and level queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEvents {
    events: Vec<LogEvent>,
}

impl LogEvents {
    /// Wrap events already in insertion order
    pub fn new(events: Vec<LogEvent>) -> Self {
        Self { events }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&LogEvent> {
        self.events.get(position)
    }

    pub fn first(&self) -> Option<&LogEvent> {
        self.events.first()
    }

    pub fn last(&self) -> Option<&LogEvent> {
        self.events.last()
    }

    pub fn iter(&self) -> slice::Iter<'_, LogEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn into_vec(self) -> Vec<LogEvent> {
        self.events
    }
}

impl From<Vec<LogEvent>> for LogEvents {
    fn from(events: Vec<LogEvent>) -> Self {
        Self::new(events)
    }
}

impl IntoIterator for LogEvents {
    type Item = LogEvent;
    type IntoIter = vec::IntoIter<LogEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a LogEvents {
    type Item = &'a LogEvent;
    type IntoIter = slice::Iter<'a, LogEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Resolve a `(start, count)` request against a tail of `len` events
///
/// A negative `start` counts as 0, `count = None` means "to the end", and
/// both bounds are clamped to `len`. The result is a half-open range that
/// may be empty.
pub(crate) fn range_bounds(start: i64, count: Option<usize>, len: usize) -> (usize, usize) {
    let start = usize::try_from(start.max(0)).unwrap_or(usize::MAX).min(len);
    let end = match count {
        Some(count) => start.saturating_add(count).min(len),
        None => len,
    };
    (start, end)
}
