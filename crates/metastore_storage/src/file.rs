//! File-based object store for persistent storage.

use crate::backend::{Generation, ObjectStore, ObjectVersion};
use crate::error::{StorageError, StorageResult};
use bytes::Bytes;
use fs2::FileExt;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Lock file serialising replaces across processes.
const LOCK_FILE: &str = ".lock";

/// A file-based object store.
///
/// Each object is a file under the root directory; `/`-separated object
/// paths map onto nested directories. Data survives process restarts.
///
/// # Generations
///
/// The generation of an object is the SHA-256 of its content, in the
/// spirit of an HTTP ETag. Rewriting identical bytes keeps the token.
///
/// # Atomicity
///
/// - Replaces hold an exclusive advisory lock on `<root>/.lock`, so
///   writers in other processes sharing the directory are serialised
/// - New content is written to a temporary file, synced, then renamed
///   over the target, so readers see either the old or the new object
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use metastore_storage::{FileObjectStore, ObjectStore};
/// use std::path::Path;
///
/// let store = FileObjectStore::open(Path::new("metastore")).unwrap();
/// store
///     .compare_and_replace("tenant-a/metastore/w.store", None, Bytes::from_static(b"x"))
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct FileObjectStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileObjectStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or `root`
    /// exists but is not a directory.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        if !root.is_dir() {
            return Err(StorageError::invalid_path(
                root.display().to_string(),
                "store root is not a directory",
            ));
        }

        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps an object path to a file path, rejecting anything that could
    /// escape the root or collide with the store's own files.
    fn object_file(&self, path: &str) -> StorageResult<PathBuf> {
        if path.is_empty() {
            return Err(StorageError::invalid_path(path, "path is empty"));
        }
        if path.starts_with('/') || path.contains('\\') {
            return Err(StorageError::invalid_path(path, "path must be relative"));
        }

        let mut file = self.root.clone();
        for component in path.split('/') {
            if component.is_empty() {
                return Err(StorageError::invalid_path(path, "empty path component"));
            }
            if component.starts_with('.') {
                return Err(StorageError::invalid_path(
                    path,
                    "path components must not start with '.'",
                ));
            }
            file.push(component);
        }
        Ok(file)
    }

    fn read_file(file: &Path) -> StorageResult<Option<Bytes>> {
        match fs::read(file) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn lock_root(&self) -> StorageResult<File> {
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn collect(&self, dir: &Path, relative: &str, out: &mut Vec<String>) -> StorageResult<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            // Lock and temp files.
            if name.starts_with('.') {
                continue;
            }

            let child = if relative.is_empty() {
                name.to_string()
            } else {
                format!("{relative}/{name}")
            };

            if entry.file_type()?.is_dir() {
                self.collect(&entry.path(), &child, out)?;
            } else {
                out.push(child);
            }
        }
        Ok(())
    }
}

/// Computes the generation token for `data`.
fn content_generation(data: &[u8]) -> Generation {
    let digest = Sha256::digest(data);
    let mut token = String::with_capacity(digest.len() * 2);
    for byte in digest {
        token.push_str(&format!("{byte:02x}"));
    }
    Generation::new(token)
}

impl ObjectStore for FileObjectStore {
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>> {
        let file = self.object_file(path)?;
        Ok(Self::read_file(&file)?.map(|data| ObjectVersion {
            generation: content_generation(&data),
            data,
        }))
    }

    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation> {
        let file = self.object_file(path)?;

        let _guard = self.write_lock.lock();
        let _lock = self.lock_root()?;

        let current = Self::read_file(&file)?.map(|data| content_generation(&data));
        if current.as_ref() != expected {
            return Err(StorageError::precondition_failed(path));
        }

        let parent = file
            .parent()
            .ok_or_else(|| StorageError::invalid_path(path, "path has no parent"))?;
        fs::create_dir_all(parent)?;

        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::invalid_path(path, "path has no file name"))?;
        let temp = parent.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let written = (|| -> StorageResult<()> {
            let mut out = File::create(&temp)?;
            out.write_all(&data)?;
            out.sync_all()?;
            fs::rename(&temp, &file)?;
            Ok(())
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        Ok(content_generation(&data))
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut paths = Vec::new();
        self.collect(&self.root, "", &mut paths)?;
        paths.retain(|p| p.starts_with(prefix));
        paths.sort();
        Ok(paths)
    }
}
