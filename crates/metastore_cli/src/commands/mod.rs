//! CLI command implementations.

pub mod inspect;
pub mod query;
pub mod register;
pub mod windows;

use crate::error::{CliError, CliResult};
use crate::Format;
use metastore_core::UpdaterConfig;
use metastore_storage::FileObjectStore;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Options shared by all commands.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory of the object store.
    pub root: Option<PathBuf>,
    /// Metastore window size.
    pub window_size: Duration,
}

impl Settings {
    /// Opens the object store, failing if no root was given.
    pub fn open_store(&self, command: &'static str) -> CliResult<FileObjectStore> {
        let root = self.root.as_ref().ok_or(CliError::MissingRoot(command))?;
        Ok(FileObjectStore::open(root)?)
    }

    /// Updater configuration for these settings.
    pub fn config(&self) -> UpdaterConfig {
        UpdaterConfig::default().with_window_size(self.window_size)
    }
}

/// Prints `value` as JSON, or through `text` otherwise.
pub fn emit<T: Serialize>(format: Format, value: &T, text: impl FnOnce(&T)) -> CliResult<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Text => text(value),
    }
    Ok(())
}
