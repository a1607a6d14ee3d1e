//! Object store trait definition.

use crate::error::StorageResult;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// An opaque token identifying one version of an object's content.
///
/// Tokens are only meaningful to the store that issued them. Two reads of
/// an unchanged object return equal tokens; any successful replace produces
/// a token different from the one it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generation(String);

impl Generation {
    /// Wraps a store-specific token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The content of an object together with the generation it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    /// Object bytes.
    pub data: Bytes,
    /// Generation of `data`.
    pub generation: Generation,
}

/// A flat, eventually-consistent object store with conditional replace.
///
/// Stores are **opaque byte stores**. The metastore owns all interpretation
/// of object content.
///
/// # Invariants
///
/// - `read` returns `None` for absent objects, never an error
/// - `read` is atomic: it never observes a partially written object
/// - `compare_and_replace` either swaps the whole object or fails; a
///   conflict is reported as [`crate::StorageError::PreconditionFailed`]
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryObjectStore`] - For testing
/// - [`super::FileObjectStore`] - For persistent storage
pub trait ObjectStore: Send + Sync {
    /// Reads the current content and generation of the object at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or an I/O error occurs.
    /// Absence is not an error.
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>>;

    /// Atomically replaces the object at `path` with `data`.
    ///
    /// The replace only happens if the current generation equals
    /// `expected`, where `None` means the object must not exist yet.
    /// Returns the generation of the newly written content.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::PreconditionFailed`] if the object
    /// changed since `expected` was observed, or another error if the
    /// write fails. A failed replace leaves the prior content untouched.
    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation>;

    /// Lists the paths of all objects starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>> {
        (**self).read(path)
    }

    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation> {
        (**self).compare_and_replace(path, expected, data)
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).list(prefix)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>> {
        (**self).read(path)
    }

    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation> {
        (**self).compare_and_replace(path, expected, data)
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).list(prefix)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>> {
        (**self).read(path)
    }

    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation> {
        (**self).compare_and_replace(path, expected, data)
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).list(prefix)
    }
}
