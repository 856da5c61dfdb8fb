//! Event codecs
//!
//! A codec only turns one [`LogEvent`] into a payload and back. Framing of
//! payloads inside the backing file belongs to the store.

use crate::error::TailError;
use crate::event::LogEvent;

/// Serialization capability injected into a tail
pub trait LogCodec: Send + Sync {
    /// Encode an event into a record payload
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, TailError>;

    /// Decode a record payload
    fn decode(&self, bytes: &[u8]) -> Result<LogEvent, TailError>;
}

/// Compact binary codec (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct PostcardCodec;

impl LogCodec for PostcardCodec {
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, TailError> {
        postcard::to_allocvec(event).map_err(|e| TailError::serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<LogEvent, TailError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

/// JSON codec, handy when the file should be inspectable with ordinary tools
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl LogCodec for JsonCodec {
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, TailError> {
        serde_json::to_vec(event).map_err(|e| TailError::serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<LogEvent, TailError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl<C: LogCodec + ?Sized> LogCodec for std::sync::Arc<C> {
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, TailError> {
        (**self).encode(event)
    }

    fn decode(&self, bytes: &[u8]) -> Result<LogEvent, TailError> {
        (**self).decode(bytes)
    }
}
