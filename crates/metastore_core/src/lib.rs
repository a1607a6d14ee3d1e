//! # Metastore Core
//!
//! Window-partitioned index of immutable data objects.
//!
//! Every tenant's timeline is cut into fixed-size windows aligned to the
//! Unix epoch. Each window has one metastore object in the object store
//! listing the data objects whose time range touches it. Writers register
//! new data objects with [`Updater::update`]; readers find the objects
//! covering a time range with [`MetastoreReader::list_data_objects`].
//!
//! Writers never lock. Each window is updated by reading the object and
//! its generation, re-encoding all existing records plus the new one, and
//! replacing the object only if its generation is unchanged. Conflicts and
//! transient failures are retried with bounded, jittered exponential
//! backoff.
//!
//! ## Usage
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use metastore_core::{Context, MetastoreReader, Updater, UpdaterConfig};
//! use metastore_storage::InMemoryObjectStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryObjectStore::new());
//! let config = UpdaterConfig::default();
//! let mut updater = Updater::new(Arc::clone(&store), config.clone()).unwrap();
//!
//! let min = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
//! let max = Utc.with_ymd_and_hms(2024, 1, 1, 0, 45, 0).unwrap();
//! let ctx = Context::new();
//! updater.update(&ctx, "tenant-a", "objects/0001", min, max).unwrap();
//!
//! let reader = MetastoreReader::new(store, &config).unwrap();
//! let found = reader.list_data_objects(&ctx, "tenant-a", min, max).unwrap();
//! assert_eq!(found, vec!["objects/0001"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod config;
mod context;
mod error;
mod metrics;
mod reader;
mod record;
mod replay;
mod updater;
mod window;

pub use backoff::{Backoff, BackoffConfig};
pub use config::{UpdaterConfig, DEFAULT_REPLAY_BATCH_SIZE, DEFAULT_WINDOW_SIZE};
pub use context::Context;
pub use error::{CoreError, CoreResult};
pub use metrics::{
    HistogramSnapshot, InMemoryRegistry, LatencyHistogram, MetricsRegistry, MetricsSnapshot,
    UpdaterMetrics, WriteStatus, LATENCY_BUCKETS,
};
pub use reader::MetastoreReader;
pub use record::{append_record, RegistrationRecord, LABEL_END, LABEL_PATH, LABEL_START};
pub use replay::{replay, ReplayStats};
pub use updater::{Updater, DEFAULT_METRICS_NAME};
pub use window::{Window, WindowPlanner, Windows};
