//! Error types for object store operations.

use std::io;
use thiserror::Error;

/// Result type for object store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during object store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The object changed since the caller read it.
    ///
    /// Expected under contention. The caller must re-read and recompute,
    /// never blindly overwrite.
    #[error("precondition failed for {path}: object was modified concurrently")]
    PreconditionFailed {
        /// Path of the contended object.
        path: String,
    },

    /// The object path is not acceptable to this store.
    #[error("invalid object path {path:?}: {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The store is temporarily unable to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Creates a precondition-failed error for `path`.
    pub fn precondition_failed(path: impl Into<String>) -> Self {
        Self::PreconditionFailed { path: path.into() }
    }

    /// Creates an invalid-path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns true if this error is a compare-and-replace conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }

    /// Returns true if repeating the operation may succeed.
    ///
    /// Invalid paths never become valid, everything else may be transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidPath { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_classification() {
        assert!(StorageError::precondition_failed("x").is_conflict());
        assert!(!StorageError::unavailable("down").is_conflict());
    }

    #[test]
    fn retryable_classification() {
        assert!(StorageError::precondition_failed("x").is_retryable());
        assert!(StorageError::unavailable("down").is_retryable());
        assert!(!StorageError::invalid_path("../x", "escapes root").is_retryable());
    }

    #[test]
    fn error_display_names_path() {
        let err = StorageError::precondition_failed("tenant-a/metastore/w.store");
        assert!(err.to_string().contains("tenant-a/metastore/w.store"));
    }
}
