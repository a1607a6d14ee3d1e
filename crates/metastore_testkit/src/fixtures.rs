//! Test fixtures.
//!
//! Temporary stores and helpers for building metastore objects by hand.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use metastore_codec::{Builder, BuilderConfig, Entry, Label, Labels, Stream};
use metastore_storage::{FileObjectStore, Generation, ObjectStore, ObjectVersion, StorageResult};
use std::path::Path;
use tempfile::TempDir;

/// A file-backed store in a temporary directory, removed on drop.
pub struct TempFileStore {
    /// The store.
    pub store: FileObjectStore,
    _dir: TempDir,
}

impl TempFileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileObjectStore::open(dir.path()).expect("Failed to open file store");
        Self { store, _dir: dir }
    }

    /// Root directory of the store.
    pub fn path(&self) -> &Path {
        self.store.root()
    }
}

impl Default for TempFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TempFileStore {
    type Target = FileObjectStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl ObjectStore for TempFileStore {
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>> {
        self.store.read(path)
    }

    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation> {
        self.store.compare_and_replace(path, expected, data)
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.store.list(prefix)
    }
}

/// Returns `2024-01-01T{hour}:{minute}:00Z`.
///
/// # Example
///
/// ```
/// let t = metastore_testkit::at(0, 10);
/// assert_eq!(t.to_rfc3339(), "2024-01-01T00:10:00+00:00");
/// ```
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0)
        .single()
        .expect("Invalid fixture time")
}

/// Encodes `streams` into a data object with default builder settings.
pub fn encode_streams(streams: &[Stream]) -> Bytes {
    let mut builder = Builder::new(BuilderConfig::default()).expect("Invalid builder config");
    for stream in streams {
        builder.append(stream).expect("Failed to append stream");
    }
    let mut out = Vec::new();
    builder.flush(&mut out).expect("Failed to flush builder");
    Bytes::from(out)
}

/// A stream labeled `{name="value"}` with one empty entry.
pub fn labeled_stream(name: &str, value: &str) -> Stream {
    let labels = Labels::new([Label::new(name, value)]).expect("Invalid fixture labels");
    Stream::new(labels, vec![Entry::new(0, "")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use metastore_codec::Object;

    #[test]
    fn temp_store_is_usable() {
        let store = TempFileStore::new();
        assert!(store.path().exists());
        store
            .compare_and_replace("a/b", None, Bytes::from_static(b"x"))
            .unwrap();
        assert_eq!(store.list("a/").unwrap(), vec!["a/b"]);
    }

    #[test]
    fn encoded_streams_decode() {
        let data = encode_streams(&[labeled_stream("app", "api")]);
        assert!(Object::from_bytes(data).is_ok());
    }
}
