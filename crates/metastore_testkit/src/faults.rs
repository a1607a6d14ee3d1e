//! Fault injection for object stores.

use bytes::Bytes;
use metastore_storage::{Generation, ObjectStore, ObjectVersion, StorageError, StorageResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// A store call observed by [`FaultyStore`] hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// `read`
    Read,
    /// `compare_and_replace`
    Replace,
    /// `list`
    List,
}

type Hook = Arc<dyn Fn(StoreOp, &str) + Send + Sync>;

/// Wraps a store and injects failures.
///
/// Hooks run before the wrapped call, so a hook can race the caller by
/// writing to the inner store, or cancel a context mid-update.
pub struct FaultyStore<S> {
    inner: S,
    failing_paths: Mutex<Vec<String>>,
    fail_replaces: AtomicU32,
    corrupt_reads: Mutex<Vec<String>>,
    hooks: Mutex<Vec<Hook>>,
    reads: AtomicU64,
    replaces: AtomicU64,
    replace_paths: Mutex<Vec<String>>,
}

impl<S: ObjectStore> FaultyStore<S> {
    /// Wraps `inner` with no faults configured.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_paths: Mutex::new(Vec::new()),
            fail_replaces: AtomicU32::new(0),
            corrupt_reads: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            reads: AtomicU64::new(0),
            replaces: AtomicU64::new(0),
            replace_paths: Mutex::new(Vec::new()),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Makes every read and replace of a path containing `fragment` fail
    /// with [`StorageError::Unavailable`].
    pub fn fail_path(&self, fragment: impl Into<String>) {
        self.failing_paths.lock().push(fragment.into());
    }

    /// Makes the next `n` replaces fail with [`StorageError::Unavailable`].
    pub fn fail_next_replaces(&self, n: u32) {
        self.fail_replaces.store(n, Ordering::SeqCst);
    }

    /// Makes reads of a path containing `fragment` return garbage bytes
    /// instead of the stored content.
    pub fn corrupt_reads(&self, fragment: impl Into<String>) {
        self.corrupt_reads.lock().push(fragment.into());
    }

    /// Removes every configured fault. Hooks stay installed.
    pub fn heal(&self) {
        self.failing_paths.lock().clear();
        self.corrupt_reads.lock().clear();
        self.fail_replaces.store(0, Ordering::SeqCst);
    }

    /// Installs a hook run before every store call.
    pub fn on_call<F>(&self, hook: F)
    where
        F: Fn(StoreOp, &str) + Send + Sync + 'static,
    {
        self.hooks.lock().push(Arc::new(hook));
    }

    /// Number of reads issued.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of replaces issued, including failed ones.
    pub fn replaces(&self) -> u64 {
        self.replaces.load(Ordering::SeqCst)
    }

    /// Paths of all replaces issued, in order.
    pub fn replace_paths(&self) -> Vec<String> {
        self.replace_paths.lock().clone()
    }

    fn run_hooks(&self, op: StoreOp, path: &str) {
        let hooks: Vec<Hook> = self.hooks.lock().clone();
        for hook in hooks {
            hook(op, path);
        }
    }

    fn check_path(&self, path: &str) -> StorageResult<()> {
        if self.failing_paths.lock().iter().any(|f| path.contains(f.as_str())) {
            return Err(StorageError::unavailable(format!("injected failure for {path}")));
        }
        Ok(())
    }

    fn take_replace_failure(&self) -> bool {
        self.fail_replaces
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<S: ObjectStore> ObjectStore for FaultyStore<S> {
    fn read(&self, path: &str) -> StorageResult<Option<ObjectVersion>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.run_hooks(StoreOp::Read, path);
        self.check_path(path)?;

        let version = self.inner.read(path)?;
        if self.corrupt_reads.lock().iter().any(|f| path.contains(f.as_str())) {
            return Ok(Some(ObjectVersion {
                data: Bytes::from_static(b"corrupted metastore object"),
                generation: version
                    .map(|v| v.generation)
                    .unwrap_or_else(|| Generation::new("corrupt")),
            }));
        }
        Ok(version)
    }

    fn compare_and_replace(
        &self,
        path: &str,
        expected: Option<&Generation>,
        data: Bytes,
    ) -> StorageResult<Generation> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.replace_paths.lock().push(path.to_string());
        self.run_hooks(StoreOp::Replace, path);
        self.check_path(path)?;
        if self.take_replace_failure() {
            return Err(StorageError::unavailable("injected replace failure"));
        }
        self.inner.compare_and_replace(path, expected, data)
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.run_hooks(StoreOp::List, prefix);
        self.inner.list(prefix)
    }
}

impl<S> std::fmt::Debug for FaultyStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyStore")
            .field("reads", &self.reads.load(Ordering::SeqCst))
            .field("replaces", &self.replaces.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metastore_storage::InMemoryObjectStore;

    #[test]
    fn failing_path_only_affects_matches() {
        let store = FaultyStore::new(InMemoryObjectStore::new());
        store.fail_path("bad");
        assert!(store.read("bad/1").is_err());
        assert!(store.read("good/1").unwrap().is_none());
        assert!(store.compare_and_replace("bad/1", None, Bytes::new()).is_err());
        assert!(store.compare_and_replace("good/1", None, Bytes::new()).is_ok());
    }

    #[test]
    fn replace_failures_are_counted_down() {
        let store = FaultyStore::new(InMemoryObjectStore::new());
        store.fail_next_replaces(2);
        assert!(store.compare_and_replace("a", None, Bytes::new()).is_err());
        assert!(store.compare_and_replace("a", None, Bytes::new()).is_err());
        assert!(store.compare_and_replace("a", None, Bytes::new()).is_ok());
        assert_eq!(store.replaces(), 3);
        assert_eq!(store.replace_paths(), vec!["a", "a", "a"]);
    }

    #[test]
    fn corrupt_reads_keep_generation() {
        let store = FaultyStore::new(InMemoryObjectStore::new());
        let generation = store
            .compare_and_replace("w", None, Bytes::from_static(b"ok"))
            .unwrap();
        store.corrupt_reads("w");
        let version = store.read("w").unwrap().unwrap();
        assert_ne!(version.data, Bytes::from_static(b"ok"));
        assert_eq!(version.generation, generation);

        store.heal();
        assert_eq!(store.read("w").unwrap().unwrap().data, Bytes::from_static(b"ok"));
    }

    #[test]
    fn hooks_see_every_call() {
        let store = FaultyStore::new(InMemoryObjectStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.on_call(move |op, path| sink.lock().push((op, path.to_string())));

        store.read("a").unwrap();
        store.compare_and_replace("a", None, Bytes::new()).unwrap();
        store.list("").unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                (StoreOp::Read, "a".to_string()),
                (StoreOp::Replace, "a".to_string()),
                (StoreOp::List, String::new()),
            ]
        );
    }
}
