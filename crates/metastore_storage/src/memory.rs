//! In-memory object store for testing.

use crate::backend::{Generation, ObjectStore, ObjectVersion};
use crate::error::{StorageError, StorageResult};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, (Bytes, u64)>,
    next_generation: u64,
}

/// An in-memory object store.
///
/// This store keeps all objects in memory and is suitable for:
/// - Unit tests
/// - Integration tests exercising concurrent writers
/// - Ephemeral metastores that don't need persistence
///
/// Generations are drawn from a single counter, so a token is never reused
/// even if an object is rewritten with identical bytes.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
/// Compare-and-replace runs under the write lock.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use metastore_storage::{InMemoryObjectStore, ObjectStore};
///
/// let store = InMemoryObjectStore::new();
/// let g1 = store.compare_and_replace("w", None, Bytes::from_static(b"a")).unwrap();
/// assert!(store.compare_and_replace("w", None, Bytes::from_static(b"b")).is_err());
/// store.compare_and_replace("w", Some(&g1), Bytes::from_static(b"b")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    inner: RwLock<Inner>,
}

impl InMemoryObjectStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().objects.len()
    }

    /// Returns true if the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().objects.is_empty()
    }

    /// Returns a copy of the object at `path`, if any.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.inner.read().objects.get(path).map(|(data, _)| data.clone())
    }

    /// Removes every object.
    pub fn clear(&self) {
        self.inner.write().objects.clear();
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>> {
        let inner = self.inner.read();
        Ok(inner.objects.get(path).map(|(data, generation)| ObjectVersion {
            data: data.clone(),
            generation: Generation::new(generation.to_string()),
        }))
    }

    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation> {
        if path.is_empty() {
            return Err(StorageError::invalid_path(path, "path is empty"));
        }

        let mut inner = self.inner.write();
        let current = inner
            .objects
            .get(path)
            .map(|(_, generation)| generation.to_string());

        let matches = match (current.as_deref(), expected) {
            (None, None) => true,
            (Some(current), Some(expected)) => current == expected.as_str(),
            _ => false,
        };
        if !matches {
            return Err(StorageError::precondition_failed(path));
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.objects.insert(path.to_string(), (data, generation));
        Ok(Generation::new(generation.to_string()))
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let inner = self.inner.read();
        Ok(inner
            .objects
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryObjectStore::new();
        assert!(store.is_empty());
        assert!(store.read("missing").unwrap().is_none());
    }

    #[test]
    fn memory_create_requires_absent() {
        let store = InMemoryObjectStore::new();
        store
            .compare_and_replace("w", None, Bytes::from_static(b"first"))
            .unwrap();

        let result = store.compare_and_replace("w", None, Bytes::from_static(b"second"));
        assert!(matches!(result, Err(StorageError::PreconditionFailed { .. })));
        assert_eq!(store.get("w").unwrap(), Bytes::from_static(b"first"));
    }

    #[test]
    fn memory_replace_with_current_generation() {
        let store = InMemoryObjectStore::new();
        let g1 = store
            .compare_and_replace("w", None, Bytes::from_static(b"one"))
            .unwrap();
        let g2 = store
            .compare_and_replace("w", Some(&g1), Bytes::from_static(b"two"))
            .unwrap();
        assert_ne!(g1, g2);

        let current = store.read("w").unwrap().unwrap();
        assert_eq!(current.generation, g2);
        assert_eq!(&current.data[..], b"two");
    }

    #[test]
    fn memory_stale_generation_conflicts() {
        let store = InMemoryObjectStore::new();
        let g1 = store
            .compare_and_replace("w", None, Bytes::from_static(b"one"))
            .unwrap();
        store
            .compare_and_replace("w", Some(&g1), Bytes::from_static(b"two"))
            .unwrap();

        let result = store.compare_and_replace("w", Some(&g1), Bytes::from_static(b"three"));
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(store.get("w").unwrap(), Bytes::from_static(b"two"));
    }

    #[test]
    fn memory_expected_generation_for_absent_object_conflicts() {
        let store = InMemoryObjectStore::new();
        let result = store.compare_and_replace(
            "w",
            Some(&Generation::new("1")),
            Bytes::from_static(b"x"),
        );
        assert!(result.unwrap_err().is_conflict());
        assert!(store.is_empty());
    }

    #[test]
    fn memory_identical_bytes_get_new_generation() {
        let store = InMemoryObjectStore::new();
        let g1 = store
            .compare_and_replace("w", None, Bytes::from_static(b"same"))
            .unwrap();
        let g2 = store
            .compare_and_replace("w", Some(&g1), Bytes::from_static(b"same"))
            .unwrap();
        assert_ne!(g1, g2);
    }

    #[test]
    fn memory_list_by_prefix() {
        let store = InMemoryObjectStore::new();
        for path in ["tenant-a/x", "tenant-a/y", "tenant-b/x"] {
            store
                .compare_and_replace(path, None, Bytes::from_static(b"."))
                .unwrap();
        }

        assert_eq!(
            store.list("tenant-a/").unwrap(),
            vec!["tenant-a/x".to_string(), "tenant-a/y".to_string()]
        );
        assert_eq!(store.list("").unwrap().len(), 3);
        assert!(store.list("tenant-c/").unwrap().is_empty());
    }

    #[test]
    fn memory_rejects_empty_path() {
        let store = InMemoryObjectStore::new();
        let result = store.compare_and_replace("", None, Bytes::new());
        assert!(matches!(result, Err(StorageError::InvalidPath { .. })));
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryObjectStore::new();
        store
            .compare_and_replace("w", None, Bytes::from_static(b"x"))
            .unwrap();
        store.clear();
        assert_eq!(store.len(), 0);
    }
}
