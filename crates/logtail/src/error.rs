//! Error types for logtail
//!
//! Only failures a caller can act on surface as [`TailError`]. Staleness and
//! absence of the backing file are recovered inside the tail and show up as
//! empty query results instead.

use thiserror::Error;

/// Errors that can occur in log tail operations
#[derive(Debug, Error)]
pub enum TailError {
    /// I/O error while opening, appending to or flushing the backing file
    #[error("I/O error: {0}")]
    Io(String),

    /// Error while encoding an event
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error while decoding a stored record
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Encoded record exceeds the configured maximum
    #[error("Record of {len} bytes exceeds maximum of {max} bytes")]
    RecordTooLarge {
        /// Encoded size of the record
        len: usize,
        /// Configured maximum
        max: u32,
    },
}

impl From<std::io::Error> for TailError {
    fn from(err: std::io::Error) -> Self {
        TailError::Io(err.to_string())
    }
}

impl TailError {
    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new Deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}

impl From<postcard::Error> for TailError {
    fn from(err: postcard::Error) -> Self {
        TailError::Deserialization(err.to_string())
    }
}

impl From<serde_json::Error> for TailError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            TailError::Io(err.to_string())
        } else {
            TailError::Deserialization(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: TailError = io_err.into();
        assert!(matches!(err, TailError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_record_too_large_message() {
        let err = TailError::RecordTooLarge { len: 20, max: 10 };
        assert_eq!(
            err.to_string(),
            "Record of 20 bytes exceeds maximum of 10 bytes"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: TailError = json_err.into();
        assert!(matches!(err, TailError::Deserialization(_)));
    }
}
