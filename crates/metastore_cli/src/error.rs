//! CLI errors.

use metastore_codec::CodecError;
use metastore_core::CoreError;
use metastore_storage::StorageError;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command needs an object store root.
    #[error("--root is required for {0}")]
    MissingRoot(&'static str),

    /// The requested metastore object does not exist.
    #[error("no metastore object at {0}")]
    NotFound(String),

    /// Metastore error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Object store error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Data object decoding error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// JSON output error.
    #[error("writing json: {0}")]
    Json(#[from] serde_json::Error),
}
