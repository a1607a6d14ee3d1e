//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while building or decoding data objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a page or section.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a page or section.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// The bytes are not a well-formed data object.
    #[error("invalid data object: {message}")]
    InvalidObject {
        /// Description of the structural error.
        message: String,
    },

    /// The object trailer checksum does not match its content.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the object.
        expected: u32,
        /// Checksum computed over the content.
        actual: u32,
    },

    /// A label set is malformed.
    #[error("invalid labels: {message}")]
    InvalidLabels {
        /// Description of the label error.
        message: String,
    },

    /// Appending would exceed the target object size.
    #[error("builder full")]
    BuilderFull,

    /// Flush was called with nothing appended.
    #[error("builder empty")]
    BuilderEmpty,

    /// A section was opened with the wrong reader.
    #[error("section kind mismatch: expected {expected}, got {actual}")]
    SectionKindMismatch {
        /// Kind the reader handles.
        expected: String,
        /// Kind of the section.
        actual: String,
    },

    /// Builder configuration is invalid.
    #[error("invalid builder config: {0}")]
    InvalidConfig(String),

    /// Writing the flushed object failed.
    #[error("write failed: {message}")]
    Io {
        /// Description of the I/O error.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid object error.
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }

    /// Create an invalid labels error.
    pub fn invalid_labels(message: impl Into<String>) -> Self {
        Self::InvalidLabels {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}
