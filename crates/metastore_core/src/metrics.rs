//! Updater metrics.
//!
//! Counters and latency histograms are atomic and can be read while updates
//! are in progress. [`UpdaterMetrics::snapshot`] produces a plain
//! serializable copy for export.
//!
//! # Usage
//!
//! ```
//! use metastore_core::{InMemoryRegistry, MetricsRegistry, UpdaterMetrics};
//! use std::sync::Arc;
//!
//! let registry = InMemoryRegistry::new();
//! let metrics = Arc::new(UpdaterMetrics::new());
//! registry.register("metastore_updater", Arc::clone(&metrics)).unwrap();
//!
//! let snapshots = registry.gather();
//! assert_eq!(snapshots["metastore_updater"].updates, 0);
//! ```

use crate::error::{CoreError, CoreResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bounds, in seconds, of the latency histogram buckets.
pub const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0, 300.0,
];

/// Outcome label of a window write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// The compare-and-replace succeeded.
    Success,
    /// The attempt failed and may be retried.
    Failure,
}

/// Fixed-bucket latency histogram.
#[derive(Debug)]
pub struct LatencyHistogram {
    buckets: [AtomicU64; LATENCY_BUCKETS.len()],
    overflow: AtomicU64,
    count: AtomicU64,
    sum_micros: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            overflow: AtomicU64::new(0),
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
        }
    }
}

impl LatencyHistogram {
    /// Records one observation.
    pub fn observe(&self, duration: Duration) {
        let secs = duration.as_secs_f64();
        match LATENCY_BUCKETS.iter().position(|upper| secs <= *upper) {
            Some(i) => self.buckets[i].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
        self.count.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy with cumulative bucket counts.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut cumulative = 0;
        let buckets = LATENCY_BUCKETS
            .iter()
            .zip(&self.buckets)
            .map(|(upper, count)| {
                cumulative += count.load(Ordering::Relaxed);
                (*upper, cumulative)
            })
            .collect();
        HistogramSnapshot {
            buckets,
            count: self.count(),
            sum_seconds: self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}

/// A serializable histogram copy.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HistogramSnapshot {
    /// `(upper bound in seconds, cumulative count)` per bucket.
    pub buckets: Vec<(f64, u64)>,
    /// Total observations, including those above the last bucket.
    pub count: u64,
    /// Sum of observations in seconds.
    pub sum_seconds: f64,
}

/// Metrics of one [`Updater`](crate::Updater).
#[derive(Debug, Default)]
pub struct UpdaterMetrics {
    updates: AtomicU64,
    writes_success: AtomicU64,
    writes_failure: AtomicU64,
    windows_exhausted: AtomicU64,
    records_replayed: AtomicU64,
    bytes_written: AtomicU64,
    processing: LatencyHistogram,
    replay: LatencyHistogram,
    encoding: LatencyHistogram,
    registration_lag: LatencyHistogram,
}

impl UpdaterMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, status: WriteStatus) {
        match status {
            WriteStatus::Success => self.writes_success.fetch_add(1, Ordering::Relaxed),
            WriteStatus::Failure => self.writes_failure.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub(crate) fn record_exhausted(&self) {
        self.windows_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replayed(&self, records: usize) {
        self.records_replayed
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_written(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn observe_processing(&self, d: Duration) {
        self.processing.observe(d);
    }

    pub(crate) fn observe_replay(&self, d: Duration) {
        self.replay.observe(d);
    }

    pub(crate) fn observe_encoding(&self, d: Duration) {
        self.encoding.observe(d);
    }

    pub(crate) fn observe_registration_lag(&self, d: Duration) {
        self.registration_lag.observe(d);
    }

    /// Calls to `update`.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Window write attempts with the given outcome.
    pub fn window_writes(&self, status: WriteStatus) -> u64 {
        match status {
            WriteStatus::Success => self.writes_success.load(Ordering::Relaxed),
            WriteStatus::Failure => self.writes_failure.load(Ordering::Relaxed),
        }
    }

    /// Windows abandoned after running out of retries.
    pub fn windows_exhausted(&self) -> u64 {
        self.windows_exhausted.load(Ordering::Relaxed)
    }

    /// Existing records re-appended during replay.
    pub fn records_replayed(&self) -> u64 {
        self.records_replayed.load(Ordering::Relaxed)
    }

    /// Bytes handed to the store by successful and failed replaces.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            updates: self.updates(),
            window_writes_success: self.window_writes(WriteStatus::Success),
            window_writes_failure: self.window_writes(WriteStatus::Failure),
            windows_exhausted: self.windows_exhausted(),
            records_replayed: self.records_replayed(),
            bytes_written: self.bytes_written(),
            processing_seconds: self.processing.snapshot(),
            replay_seconds: self.replay.snapshot(),
            encoding_seconds: self.encoding.snapshot(),
            registration_lag_seconds: self.registration_lag.snapshot(),
        }
    }
}

/// A point-in-time copy of [`UpdaterMetrics`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Calls to `update`.
    pub updates: u64,
    /// Successful window writes.
    pub window_writes_success: u64,
    /// Failed window write attempts.
    pub window_writes_failure: u64,
    /// Windows abandoned after running out of retries.
    pub windows_exhausted: u64,
    /// Existing records re-appended during replay.
    pub records_replayed: u64,
    /// Bytes handed to the store.
    pub bytes_written: u64,
    /// Duration of whole `update` calls.
    pub processing_seconds: HistogramSnapshot,
    /// Duration of reading and replaying existing content, per attempt.
    pub replay_seconds: HistogramSnapshot,
    /// Duration of appending and flushing, per attempt.
    pub encoding_seconds: HistogramSnapshot,
    /// Time from a data object's newest entry to its registration.
    pub registration_lag_seconds: HistogramSnapshot,
}

/// Destination for updater metrics.
pub trait MetricsRegistry: Send + Sync {
    /// Registers `metrics` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MetricsAlreadyRegistered`] if `name` is taken.
    fn register(&self, name: &str, metrics: Arc<UpdaterMetrics>) -> CoreResult<()>;

    /// Removes the metrics registered under `name`. Returns false if
    /// nothing was registered.
    fn unregister(&self, name: &str) -> bool;
}

/// A registry that keeps metrics in memory for inspection.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: Mutex<BTreeMap<String, Arc<UpdaterMetrics>>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    /// Snapshots every registered collector.
    pub fn gather(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.entries
            .lock()
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
            .collect()
    }
}

impl MetricsRegistry for InMemoryRegistry {
    fn register(&self, name: &str, metrics: Arc<UpdaterMetrics>) -> CoreResult<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            return Err(CoreError::MetricsAlreadyRegistered(name.to_string()));
        }
        entries.insert(name.to_string(), metrics);
        Ok(())
    }

    fn unregister(&self, name: &str) -> bool {
        self.entries.lock().remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let metrics = UpdaterMetrics::new();
        assert_eq!(metrics.snapshot(), {
            let mut expected = MetricsSnapshot::default();
            let empty = LatencyHistogram::default().snapshot();
            expected.processing_seconds = empty.clone();
            expected.replay_seconds = empty.clone();
            expected.encoding_seconds = empty.clone();
            expected.registration_lag_seconds = empty;
            expected
        });
    }

    #[test]
    fn write_counters_by_status() {
        let metrics = UpdaterMetrics::new();
        metrics.record_write(WriteStatus::Success);
        metrics.record_write(WriteStatus::Failure);
        metrics.record_write(WriteStatus::Failure);
        assert_eq!(metrics.window_writes(WriteStatus::Success), 1);
        assert_eq!(metrics.window_writes(WriteStatus::Failure), 2);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let hist = LatencyHistogram::default();
        hist.observe(Duration::from_micros(500));
        hist.observe(Duration::from_millis(20));
        hist.observe(Duration::from_secs(1000));

        let snap = hist.snapshot();
        assert_eq!(snap.count, 3);
        assert_eq!(snap.buckets[0], (0.001, 1));
        assert_eq!(snap.buckets[3], (0.025, 2));
        assert_eq!(snap.buckets.last().map(|b| b.1), Some(2));
        assert!(snap.sum_seconds > 1000.0);
    }

    #[test]
    fn registry_rejects_double_registration() {
        let registry = InMemoryRegistry::new();
        let metrics = Arc::new(UpdaterMetrics::new());
        registry.register("u", Arc::clone(&metrics)).unwrap();
        assert!(matches!(
            registry.register("u", metrics),
            Err(CoreError::MetricsAlreadyRegistered(_))
        ));
        assert!(registry.unregister("u"));
        assert!(!registry.unregister("u"));
        assert!(!registry.contains("u"));
    }

    #[test]
    fn gather_reflects_live_counters() {
        let registry = InMemoryRegistry::new();
        let metrics = Arc::new(UpdaterMetrics::new());
        registry.register("u", Arc::clone(&metrics)).unwrap();
        metrics.record_update();
        metrics.record_replayed(4);
        let snap = &registry.gather()["u"];
        assert_eq!(snap.updates, 1);
        assert_eq!(snap.records_replayed, 4);
    }

    #[test]
    fn snapshot_serializes() {
        let value = serde_json::to_value(UpdaterMetrics::new().snapshot()).unwrap();
        assert_eq!(value["updates"], 0);
        assert!(value["processing_seconds"]["buckets"].is_array());
    }

    #[test]
    fn concurrent_updates() {
        use std::thread;

        let metrics = Arc::new(UpdaterMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_update();
                        m.observe_encoding(Duration::from_millis(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.updates(), 800);
        assert_eq!(metrics.snapshot().encoding_seconds.count, 800);
    }
}
