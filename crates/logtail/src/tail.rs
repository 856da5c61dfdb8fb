//! File-backed log tail
//!
//! The tail owns one optional [`StoreHandle`] behind a single mutex. Writes
//! open it in [`StoreMode::Write`] and keep it open across calls. Reads use a
//! held write handle when there is one, otherwise they lease a transient read
//! handle that is released (and its record index cached) on every exit path.
//!
//! Before any handle is trusted its signature is compared with the file on
//! disk. A mismatch discards the handle; the next access reopens from
//! scratch. Nothing about a vanished or rewritten file is reported as an
//! error to readers.

use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::codec::{LogCodec, PostcardCodec};
use crate::config::TailConfig;
use crate::error::TailError;
use crate::event::{LogEvent, LogLevel};
use crate::result::{LogEvents, range_bounds};
use crate::store::{RecordIndex, StoreHandle, StoreMode};
use crate::{LogTail, LoggerTail};

/// Mutable state guarded by the tail's mutex
#[derive(Debug, Default)]
struct TailState {
    /// Backing file, `None` until `initialize`
    path: Option<PathBuf>,
    readonly: bool,
    disposed: bool,
    /// The store handle; at most one exists per tail
    handle: Option<StoreHandle>,
    /// Index left behind by the last released handle
    cached_index: Option<RecordIndex>,
    /// A write handle was lost to an external delete/rewrite
    file_lost: bool,
}

impl TailState {
    /// Drop the held handle if the file changed underneath it
    fn discard_if_stale(&mut self) {
        if let Some(handle) = self.handle.take_if(|h| h.is_stale()) {
            warn!(
                path = %handle.path().display(),
                mode = ?handle.mode(),
                "Backing file changed or vanished, discarding store handle"
            );
            if handle.mode() == StoreMode::Write {
                self.file_lost = true;
            }
            self.cached_index = None;
        }
    }

    /// Release the held handle, remembering its index
    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cached_index = Some(handle.close());
        }
    }
}

/// Scoped access to a store handle for one query
///
/// A transient handle is released when the lease drops, whichever way the
/// query returns.
enum ReadLease<'a> {
    /// The tail's own write handle, borrowed under the lock
    Held(MutexGuard<'a, TailState>),
    /// A read handle owned by this lease alone
    Transient {
        handle: Option<StoreHandle>,
        state: &'a Mutex<TailState>,
    },
}

impl ReadLease<'_> {
    fn handle(&self) -> Option<&StoreHandle> {
        match self {
            ReadLease::Held(state) => state.handle.as_ref(),
            ReadLease::Transient { handle, .. } => handle.as_ref(),
        }
    }
}

impl Drop for ReadLease<'_> {
    fn drop(&mut self) {
        if let ReadLease::Transient { handle, state } = self
            && let Some(handle) = handle.take()
        {
            let mut state = state.lock();
            if state.path.as_deref() == Some(handle.path()) {
                state.cached_index = Some(handle.into_index());
            }
        }
    }
}

/// Durable log tail over a single file
///
/// Generic over the payload codec; [`PostcardCodec`] by default.
pub struct FileLogTail<C: LogCodec = PostcardCodec> {
    codec: C,
    config: TailConfig,
    state: Mutex<TailState>,
}

impl FileLogTail<PostcardCodec> {
    /// Create an uninitialized tail with default configuration
    pub fn new() -> Self {
        Self::with_codec(PostcardCodec, TailConfig::default())
    }

    /// Create an uninitialized tail with the given configuration
    pub fn with_config(config: TailConfig) -> Self {
        Self::with_codec(PostcardCodec, config)
    }
}

impl Default for FileLogTail<PostcardCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LogCodec> FileLogTail<C> {
    /// Create an uninitialized tail using `codec` for record payloads
    pub fn with_codec(codec: C, config: TailConfig) -> Self {
        Self {
            codec,
            config,
            state: Mutex::new(TailState::default()),
        }
    }

    /// Point the tail at `path`
    ///
    /// Any handle on a previous file is released first. A read-only tail
    /// ignores every append.
    pub fn initialize(&self, path: impl AsRef<Path>, readonly: bool) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.lock();
        state.release();

        debug!(path = %path.display(), readonly, "Initializing log tail");
        *state = TailState {
            path: Some(path),
            readonly,
            ..TailState::default()
        };
    }

    /// Backing file, if initialized
    pub fn path(&self) -> Option<PathBuf> {
        self.state.lock().path.clone()
    }

    pub fn is_readonly(&self) -> bool {
        self.state.lock().readonly
    }

    /// Whether a store handle is currently held
    pub fn is_open(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Eagerly establish a store handle
    ///
    /// Writable tails open for append (creating the file), read-only or
    /// disposed tails open for reading. Returns whether a handle now exists.
    pub fn open(&self) -> bool {
        let mut state = self.state.lock();
        state.discard_if_stale();
        if state.handle.is_some() {
            return true;
        }
        let Some(path) = state.path.clone() else {
            return false;
        };

        let mode = if state.readonly || state.disposed {
            StoreMode::Read
        } else {
            StoreMode::Write
        };
        let cached = state.cached_index.take();
        match StoreHandle::open_with_index(&path, mode, &self.config, cached) {
            Ok(handle) => {
                if handle.is_some() && mode == StoreMode::Write {
                    state.file_lost = false;
                }
                state.handle = handle;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open log tail");
            }
        }
        state.handle.is_some()
    }

    /// Force appended records to disk without closing the handle
    pub fn flush(&self) -> Result<(), TailError> {
        let mut state = self.state.lock();
        match state.handle.as_mut() {
            Some(handle) => handle.flush(),
            None => Ok(()),
        }
    }

    /// Release the store handle, leaving the file in place
    ///
    /// Safe to call any number of times.
    pub fn close(&self) {
        self.state.lock().release();
    }

    /// Release the store handle and remove the backing file
    pub fn close_and_delete(&self) -> Result<(), TailError> {
        let mut state = self.state.lock();
        state.release();
        state.cached_index = None;

        let Some(path) = state.path.clone() else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted backing file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Terminal teardown: release the handle and refuse further appends
    ///
    /// Never deletes the file. Idempotent; `initialize` makes the tail
    /// writable again.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        state.release();
        if !state.disposed {
            debug!(path = ?state.path, "Log tail disposed");
        }
        state.disposed = true;
    }

    /// Validate or reopen a handle for one query
    fn lease(&self) -> Option<ReadLease<'_>> {
        let mut state = self.state.lock();
        let path = state.path.clone()?;
        state.discard_if_stale();

        if let Some(handle) = state.handle.take_if(|h| h.mode() == StoreMode::Read) {
            drop(state);
            return Some(ReadLease::Transient {
                handle: Some(handle),
                state: &self.state,
            });
        }
        if state.handle.is_some() {
            return Some(ReadLease::Held(state));
        }

        let cached = state.cached_index.take();
        drop(state);

        match StoreHandle::open_with_index(&path, StoreMode::Read, &self.config, cached) {
            Ok(Some(handle)) => Some(ReadLease::Transient {
                handle: Some(handle),
                state: &self.state,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open log tail for reading");
                None
            }
        }
    }

    /// Run `f` against a validated handle; every failure reads as `None`
    fn query<R>(&self, f: impl FnOnce(&StoreHandle) -> Result<R, TailError>) -> Option<R> {
        let lease = self.lease()?;
        let handle = lease.handle()?;
        match f(handle) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(path = %handle.path().display(), error = %e, "Query failed, treating as not found");
                None
            }
        }
    }

    fn scan_matching(&self, threshold: LogLevel, first_only: bool) -> LogEvents {
        self.query(|handle| {
            let mut matches = Vec::new();
            handle.visit(0, handle.len(), &self.codec, |_, event| {
                if event.level().meets(threshold) {
                    matches.push(event);
                    if first_only {
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(())
            })?;
            Ok(LogEvents::new(matches))
        })
        .unwrap_or_default()
    }

    /// Append under the lock, reopening a lost write handle
    fn append(&self, event: &LogEvent) -> Result<(), TailError> {
        let mut state = self.state.lock();
        if state.readonly || state.disposed {
            trace!(level = %event.level(), "Ignoring append on read-only or disposed tail");
            return Ok(());
        }
        let Some(path) = state.path.clone() else {
            trace!(level = %event.level(), "Ignoring append on uninitialized tail");
            return Ok(());
        };

        let payload = self.codec.encode(event)?;

        state.discard_if_stale();
        // A read handle from `open()` cannot append
        if state.handle.as_ref().is_some_and(|h| h.mode() == StoreMode::Read) {
            state.handle = None;
        }

        if state.handle.is_none() {
            let cached = state.cached_index.take();
            match StoreHandle::open_with_index(&path, StoreMode::Write, &self.config, cached) {
                Ok(handle) => {
                    state.handle = handle;
                    state.file_lost = false;
                }
                Err(e) if state.file_lost => {
                    trace!(error = %e, "Backing file lost, dropping appended event");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        let Some(handle) = state.handle.as_mut() else {
            return Ok(());
        };
        let index = handle.append(&payload)?;
        trace!(index, level = %event.level(), "Appended log event");
        Ok(())
    }
}

impl<C: LogCodec> LogTail for FileLogTail<C> {
    fn get_log_event(&self, index: usize) -> Option<LogEvent> {
        self.query(|handle| handle.read(index, &self.codec)).flatten()
    }

    fn get_log_events(&self, start: i64, count: Option<usize>) -> LogEvents {
        self.query(|handle| {
            let (start, end) = range_bounds(start, count, handle.len());
            handle.read_range(start, end, &self.codec).map(LogEvents::new)
        })
        .unwrap_or_default()
    }

    fn get_log_events_from(&self, level: Option<LogLevel>) -> LogEvents {
        self.scan_matching(level.unwrap_or(LogLevel::Trace), false)
    }

    fn get_first_log_event(&self, level: Option<LogLevel>) -> Option<LogEvent> {
        self.scan_matching(level.unwrap_or(LogLevel::Trace), true)
            .into_iter()
            .next()
    }

    fn get_last_log_event(&self, level: Option<LogLevel>) -> Option<LogEvent> {
        let threshold = level.unwrap_or(LogLevel::Trace);
        self.query(|handle| {
            for index in (0..handle.len()).rev() {
                if let Some(event) = handle.read(index, &self.codec)?
                    && event.level().meets(threshold)
                {
                    return Ok(Some(event));
                }
            }
            Ok(None)
        })
        .flatten()
    }

    fn size(&self) -> usize {
        self.query(|handle| Ok(handle.len())).unwrap_or(0)
    }
}

impl<C: LogCodec> LoggerTail for FileLogTail<C> {
    fn log_event(&self, event: LogEvent) -> Result<(), TailError> {
        self.append(&event)
    }
}

impl<C: LogCodec> Drop for FileLogTail<C> {
    fn drop(&mut self) {
        self.state.get_mut().release();
    }
}

impl<C: LogCodec> std::fmt::Debug for FileLogTail<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogTail")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
