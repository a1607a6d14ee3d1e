//! Inspect command implementation.

use super::{emit, Settings};
use crate::error::{CliError, CliResult};
use crate::Format;
use chrono::{DateTime, Utc};
use metastore_codec::{streams, Object};
use metastore_core::{Context, MetastoreReader};
use metastore_storage::ObjectStore;
use serde::Serialize;

/// Metastore object inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Metastore object path.
    pub path: String,
    /// Object generation.
    pub generation: String,
    /// Object size in bytes.
    pub size: usize,
    /// Number of sections.
    pub sections: usize,
    /// Number of streams sections.
    pub streams_sections: usize,
    /// Registered data objects.
    pub records: Vec<RecordInfo>,
}

/// One registered data object.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Data object path.
    pub path: String,
    /// Earliest timestamp.
    pub min: DateTime<Utc>,
    /// Latest timestamp.
    pub max: DateTime<Utc>,
}

/// Runs the inspect command.
pub fn run(settings: &Settings, window: &str, format: Format) -> CliResult<()> {
    let store = settings.open_store("inspect")?;
    let result = inspect(&store, settings, window)?;
    emit(format, &result, print_text_output)
}

/// Reads and summarizes the metastore object at `window`.
pub fn inspect<S: ObjectStore>(store: S, settings: &Settings, window: &str) -> CliResult<InspectResult> {
    let version = store
        .read(window)?
        .ok_or_else(|| CliError::NotFound(window.to_string()))?;

    let size = version.data.len();
    let object = Object::from_bytes(version.data)?;
    let streams_sections = object
        .sections()
        .iter()
        .filter(|s| streams::check_section(s))
        .count();

    let reader = MetastoreReader::new(&store, &settings.config())?;
    let records = reader
        .records_in_window(&Context::new(), window)?
        .into_iter()
        .map(|r| RecordInfo {
            path: r.data_object_path,
            min: r.min_timestamp,
            max: r.max_timestamp,
        })
        .collect();

    Ok(InspectResult {
        path: window.to_string(),
        generation: version.generation.to_string(),
        size,
        sections: object.sections().len(),
        streams_sections,
        records,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Metastore Object: {}", result.path);
    println!("  Generation: {}", result.generation);
    println!("  Size: {} bytes", result.size);
    println!(
        "  Sections: {} ({} streams)",
        result.sections, result.streams_sections
    );
    println!("  Records: {}", result.records.len());
    for record in &result.records {
        println!(
            "    {}  [{} .. {}]",
            record.path,
            record.min.to_rfc3339(),
            record.max.to_rfc3339()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metastore_core::Updater;
    use metastore_testkit::{at, TempFileStore};
    use std::time::Duration;

    #[test]
    fn inspects_written_window() {
        let store = TempFileStore::new();
        let settings = Settings {
            root: Some(store.path().to_path_buf()),
            window_size: Duration::from_secs(3600),
        };
        let mut updater = Updater::new(&*store, settings.config()).unwrap();
        let ctx = Context::new();
        updater.update(&ctx, "t1", "obj-1", at(0, 10), at(0, 45)).unwrap();
        updater.update(&ctx, "t1", "obj-2", at(0, 50), at(1, 20)).unwrap();

        let result = inspect(
            &*store,
            &settings,
            "tenant-t1/metastore/2024-01-01T00:00:00Z.store",
        )
        .unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].path, "obj-2");
        assert_eq!(result.records[1].max, at(1, 20));
        assert!(result.streams_sections >= 1);
        assert_eq!(result.generation.len(), 64);
    }

    #[test]
    fn missing_window_is_reported() {
        let store = TempFileStore::new();
        let settings = Settings {
            root: Some(store.path().to_path_buf()),
            window_size: Duration::from_secs(3600),
        };
        assert!(matches!(
            inspect(&*store, &settings, "tenant-x/metastore/none.store"),
            Err(CliError::NotFound(_))
        ));
    }
}
