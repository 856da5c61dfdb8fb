//! Store handle over the backing file
//!
//! A [`StoreHandle`] couples an open file with the [`FileSignature`] observed
//! when it was opened (or last written by this handle) and an offset index of
//! every complete record. The handle is only trustworthy while the signature
//! on disk still matches; callers check [`StoreHandle::is_stale`] before use.
//!
//! ## Storage Format
//!
//! ```text
//! [4 bytes: len (big-endian)][len bytes: codec payload][4 bytes: len][...]
//! ```
//!
//! A zero or oversized length prefix, or a record running past the end of
//! the file, ends the scan. Write handles cut such a torn tail off so new
//! records stay reachable.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, instrument, warn};

use crate::codec::LogCodec;
use crate::config::TailConfig;
use crate::error::TailError;
use crate::event::LogEvent;

const LEN_PREFIX: u64 = 4;

/// (size, last-modified) pair identifying one state of the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSignature {
    /// No regular file at the path
    Missing,
    /// File present with the given size and modification time
    Present {
        len: u64,
        modified: Option<SystemTime>,
    },
}

impl FileSignature {
    /// Current signature of `path`
    pub fn of(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => Self::from_metadata(&meta),
            Err(_) => Self::Missing,
        }
    }

    fn from_metadata(meta: &fs::Metadata) -> Self {
        if !meta.is_file() {
            return Self::Missing;
        }
        Self::Present {
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether the file at `path` no longer matches this signature
    pub fn is_stale(&self, path: &Path) -> bool {
        self.is_missing() || Self::of(path) != *self
    }
}

/// How a handle was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Sequential reads only
    Read,
    /// Appends (reads are still possible through the same handle)
    Write,
}

/// Offsets of every complete record plus the signature they were derived from
#[derive(Debug, Clone)]
pub struct RecordIndex {
    offsets: Vec<u64>,
    end: u64,
    signature: FileSignature,
}

impl RecordIndex {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn signature(&self) -> FileSignature {
        self.signature
    }

    /// Scan length prefixes from the start of `file`
    fn scan(file: &File, file_len: u64, max_record_size: u32) -> io::Result<Self> {
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(0))?;

        let mut offsets = Vec::new();
        let mut offset = 0u64;

        while offset + LEN_PREFIX <= file_len {
            let mut len_buf = [0u8; 4];
            if reader.read_exact(&mut len_buf).is_err() {
                warn!(offset, "Truncated length prefix, stopping scan");
                break;
            }

            let record_len = u32::from_be_bytes(len_buf);
            if record_len == 0 || record_len > max_record_size {
                warn!(offset, len = record_len, "Invalid record length, stopping scan");
                break;
            }

            let next = offset + LEN_PREFIX + u64::from(record_len);
            if next > file_len {
                warn!(offset, len = record_len, "Record runs past end of file, stopping scan");
                break;
            }

            offsets.push(offset);
            reader.seek_relative(i64::from(record_len))?;
            offset = next;
        }

        if offset < file_len {
            debug!(offset, file_len, "Unindexed bytes after last complete record");
        }

        Ok(Self {
            offsets,
            end: offset,
            signature: FileSignature::Missing,
        })
    }
}

/// Open connection to the backing file
#[derive(Debug)]
pub struct StoreHandle {
    path: PathBuf,
    mode: StoreMode,
    file: File,
    index: RecordIndex,
    max_record_size: u32,
    sync_on_write: bool,
}

impl StoreHandle {
    /// Open the backing file
    ///
    /// In read mode a missing file yields `Ok(None)`. In write mode the file
    /// (and, if configured, its parent directories) is created.
    pub fn open(
        path: &Path,
        mode: StoreMode,
        config: &TailConfig,
    ) -> Result<Option<Self>, TailError> {
        Self::open_with_index(path, mode, config, None)
    }

    /// Open the backing file, reusing `cached` if the file still matches it
    #[instrument(skip_all, fields(path = %path.display(), mode = ?mode))]
    pub fn open_with_index(
        path: &Path,
        mode: StoreMode,
        config: &TailConfig,
        cached: Option<RecordIndex>,
    ) -> Result<Option<Self>, TailError> {
        let file = match mode {
            StoreMode::Read => match File::open(path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "No backing file, treating tail as empty");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            },
            StoreMode::Write => {
                if config.create_parent_dirs
                    && let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)?;
                }
                OpenOptions::new()
                    .read(true)
                    .append(true)
                    .create(true)
                    .open(path)?
            }
        };

        let signature = FileSignature::from_metadata(&file.metadata()?);
        let FileSignature::Present { len, .. } = signature else {
            return Err(TailError::io(format!("{} is not a regular file", path.display())));
        };

        let mut index = match cached {
            Some(index) if index.signature == signature => {
                debug!(records = index.len(), "Reusing cached record index");
                index
            }
            _ => RecordIndex::scan(&file, len, config.max_record_size)?,
        };

        if mode == StoreMode::Write && index.end < len {
            warn!(
                path = %path.display(),
                valid = index.end,
                len,
                "Cutting torn tail off backing file"
            );
            file.set_len(index.end)?;
            index.signature = FileSignature::from_metadata(&file.metadata()?);
        } else {
            index.signature = signature;
        }

        debug!(
            path = %path.display(),
            ?mode,
            records = index.len(),
            "Store handle opened"
        );

        Ok(Some(Self {
            path: path.to_path_buf(),
            mode,
            file,
            index,
            max_record_size: config.max_record_size,
            sync_on_write: config.sync_on_write,
        }))
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signature cached by this handle
    pub fn signature(&self) -> FileSignature {
        self.index.signature
    }

    /// Whether the backing file changed underneath this handle
    pub fn is_stale(&self) -> bool {
        self.index.signature.is_stale(&self.path)
    }

    /// Number of complete records
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Decode the record at `index`, `Ok(None)` when out of range
    pub fn read<C: LogCodec + ?Sized>(
        &self,
        index: usize,
        codec: &C,
    ) -> Result<Option<LogEvent>, TailError> {
        let Some(&offset) = self.index.offsets.get(index) else {
            return Ok(None);
        };

        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let payload = read_record(&mut file, self.max_record_size)?;
        codec.decode(&payload).map(Some)
    }

    /// Decode records `start..end` (clamped to what exists) in order
    pub fn read_range<C: LogCodec + ?Sized>(
        &self,
        start: usize,
        end: usize,
        codec: &C,
    ) -> Result<Vec<LogEvent>, TailError> {
        let mut events = Vec::with_capacity(end.min(self.len()).saturating_sub(start));
        self.visit(start, end, codec, |_, event| {
            events.push(event);
            ControlFlow::Continue(())
        })?;
        Ok(events)
    }

    /// Stream records `start..end` (clamped) through `f` until it breaks
    ///
    /// Only one decoded event is alive at a time.
    pub fn visit<C, F>(&self, start: usize, end: usize, codec: &C, mut f: F) -> Result<(), TailError>
    where
        C: LogCodec + ?Sized,
        F: FnMut(usize, LogEvent) -> ControlFlow<()>,
    {
        let end = end.min(self.len());
        let Some(&first) = self.index.offsets.get(start).filter(|_| start < end) else {
            return Ok(());
        };

        let mut reader = BufReader::new(&self.file);
        reader.seek(SeekFrom::Start(first))?;

        for index in start..end {
            let payload = read_record(&mut reader, self.max_record_size)?;
            if f(index, codec.decode(&payload)?).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Append one encoded record, returning its index
    pub fn append(&mut self, payload: &[u8]) -> Result<usize, TailError> {
        if self.mode != StoreMode::Write {
            return Err(TailError::io("store handle is not open for writing"));
        }
        if payload.is_empty() || payload.len() > self.max_record_size as usize {
            return Err(TailError::RecordTooLarge {
                len: payload.len(),
                max: self.max_record_size,
            });
        }

        let mut record = Vec::with_capacity(LEN_PREFIX as usize + payload.len());
        record.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        record.extend_from_slice(payload);
        self.file.write_all(&record)?;

        if self.sync_on_write {
            self.file.sync_data()?;
        }

        let index = self.index.offsets.len();
        self.index.offsets.push(self.index.end);
        self.index.end += record.len() as u64;
        self.index.signature = FileSignature::from_metadata(&self.file.metadata()?);
        Ok(index)
    }

    /// Force written data to disk without closing
    pub fn flush(&mut self) -> Result<(), TailError> {
        self.file.flush()?;
        if self.mode == StoreMode::Write {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Release the file, keeping the index for later reuse
    pub fn into_index(self) -> RecordIndex {
        self.index
    }

    /// Release the file, syncing it first when open for writing
    pub fn close(self) -> RecordIndex {
        if self.mode == StoreMode::Write
            && let Err(e) = self.file.sync_all()
        {
            warn!(path = %self.path.display(), error = %e, "Failed to sync backing file on close");
        }
        debug!(path = %self.path.display(), mode = ?self.mode, "Store handle closed");
        self.index
    }
}

fn read_record<R: Read>(reader: &mut R, max_record_size: u32) -> Result<Vec<u8>, TailError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len == 0 || len > max_record_size {
        return Err(TailError::deserialization(format!(
            "invalid record length {}",
            len
        )));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
