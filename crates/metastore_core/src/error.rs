//! Error types for metastore operations.

use chrono::{DateTime, Utc};
use metastore_codec::CodecError;
use metastore_storage::StorageError;
use thiserror::Error;

/// Result type for metastore operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while updating or reading the metastore.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Object store error, including compare-and-replace conflicts.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Existing metastore content could not be decoded.
    #[error("decoding metastore object {path}: {source}")]
    Decode {
        /// Path of the metastore object.
        path: String,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// A record could not be appended to the builder.
    #[error("appending to metastore builder: {0}")]
    Append(#[source] CodecError),

    /// The builder could not be flushed to bytes.
    #[error("flushing metastore builder: {0}")]
    Encode(#[source] CodecError),

    /// A stored record is missing or has malformed reserved labels.
    #[error("invalid registration record: {0}")]
    InvalidRecord(String),

    /// The time range ends before it starts.
    #[error("invalid time range: max {max} is before min {min}")]
    InvalidTimeRange {
        /// Range start.
        min: DateTime<Utc>,
        /// Range end.
        max: DateTime<Utc>,
    },

    /// A caller-supplied argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration is invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The operation was cancelled through its context.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Every attempt to update a window failed.
    #[error("updating metastore {path} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Path of the metastore object.
        path: String,
        /// Number of attempts made.
        attempts: u32,
        /// Error of the last attempt.
        #[source]
        source: Box<CoreError>,
    },

    /// A metrics collector with this name is already registered.
    #[error("metrics already registered: {0}")]
    MetricsAlreadyRegistered(String),
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord(message.into())
    }

    /// Creates an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns true for cancellation and deadline errors.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Returns true if this is a compare-and-replace conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_conflict())
    }

    /// Returns true if another attempt of the same window may succeed.
    ///
    /// Decode errors count as retryable: a bounded number of attempts is
    /// made before the error is surfaced.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Decode { .. } | Self::Append(_) | Self::Encode(_) => true,
            _ => false,
        }
    }

    /// Returns the window path this error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Decode { path, .. } | Self::RetriesExhausted { path, .. } => Some(path),
            Self::Storage(StorageError::PreconditionFailed { path })
            | Self::Storage(StorageError::InvalidPath { path, .. }) => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(CoreError::from(StorageError::precondition_failed("w")).is_retryable());
        assert!(CoreError::from(StorageError::unavailable("down")).is_retryable());
        assert!(CoreError::Append(CodecError::BuilderFull).is_retryable());
        assert!(CoreError::Decode {
            path: "w".into(),
            source: CodecError::invalid_object("bad magic"),
        }
        .is_retryable());
        assert!(!CoreError::Cancelled.is_retryable());
        assert!(!CoreError::DeadlineExceeded.is_retryable());
        assert!(!CoreError::invalid_argument("empty path").is_retryable());
        assert!(!CoreError::invalid_record("missing __path__").is_retryable());
    }

    #[test]
    fn cancellation_errors() {
        assert!(CoreError::Cancelled.is_cancellation());
        assert!(CoreError::DeadlineExceeded.is_cancellation());
        assert!(!CoreError::from(StorageError::unavailable("x")).is_cancellation());
    }

    #[test]
    fn conflict_detection() {
        assert!(CoreError::from(StorageError::precondition_failed("w")).is_conflict());
        assert!(!CoreError::Append(CodecError::BuilderFull).is_conflict());
    }

    #[test]
    fn exhausted_error_names_window() {
        let err = CoreError::RetriesExhausted {
            path: "tenant-t1/metastore/2024-01-01T01:00:00Z.store".into(),
            attempts: 3,
            source: Box::new(CoreError::from(StorageError::unavailable("down"))),
        };
        assert_eq!(
            err.path(),
            Some("tenant-t1/metastore/2024-01-01T01:00:00Z.store")
        );
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
