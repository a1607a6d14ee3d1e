//! Metastore updater.
//!
//! Registers data objects in every metastore window their time range
//! spans. Each window is updated with an optimistic read-modify-write:
//! read the current object and its generation, replay its records into a
//! fresh builder, append the new record, then compare-and-replace against
//! the generation that was read. A lost race surfaces as a conflict and the
//! window is retried from a fresh read, so concurrent writers converge
//! without locks.

use crate::backoff::Backoff;
use crate::config::UpdaterConfig;
use crate::context::Context;
use crate::error::{CoreError, CoreResult};
use crate::metrics::{MetricsRegistry, UpdaterMetrics, WriteStatus};
use crate::record::{append_record, RegistrationRecord};
use crate::replay::replay;
use crate::window::{validate_tenant, WindowPlanner};
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};
use metastore_codec::Builder;
use metastore_storage::{Generation, ObjectStore, ObjectVersion};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Default name used when registering updater metrics.
pub const DEFAULT_METRICS_NAME: &str = "metastore_updater";

/// Appends registration records to window metastore objects.
///
/// An updater owns one builder and one buffer, so `update` takes
/// `&mut self`; use one updater per thread. Updaters on different threads
/// or processes may target the same windows concurrently.
pub struct Updater<S> {
    store: S,
    config: UpdaterConfig,
    planner: WindowPlanner,
    builder: Builder,
    buf: BytesMut,
    backoff: Backoff,
    metrics: Arc<UpdaterMetrics>,
    metrics_name: String,
}

impl<S: ObjectStore> Updater<S> {
    /// Creates an updater writing to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `config` fails validation.
    pub fn new(store: S, config: UpdaterConfig) -> CoreResult<Self> {
        config.validate()?;
        let planner = WindowPlanner::new(config.window_size)?;
        let builder = Builder::new(config.builder.clone())
            .map_err(|e| CoreError::invalid_config(e.to_string()))?;
        let backoff = Backoff::new(config.backoff.clone());
        Ok(Self {
            store,
            config,
            planner,
            builder,
            buf: BytesMut::new(),
            backoff,
            metrics: Arc::new(UpdaterMetrics::new()),
            metrics_name: DEFAULT_METRICS_NAME.to_string(),
        })
    }

    /// Sets the name used by [`register_metrics`](Self::register_metrics).
    #[must_use]
    pub fn with_metrics_name(mut self, name: impl Into<String>) -> Self {
        self.metrics_name = name.into();
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the window planner.
    pub fn planner(&self) -> &WindowPlanner {
        &self.planner
    }

    /// Returns the live metrics.
    pub fn metrics(&self) -> &Arc<UpdaterMetrics> {
        &self.metrics
    }

    /// Registers this updater's metrics with `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MetricsAlreadyRegistered`] if the name is taken.
    pub fn register_metrics(&self, registry: &dyn MetricsRegistry) -> CoreResult<()> {
        registry.register(&self.metrics_name, Arc::clone(&self.metrics))
    }

    /// Removes this updater's metrics from `registry`.
    pub fn unregister_metrics(&self, registry: &dyn MetricsRegistry) -> bool {
        registry.unregister(&self.metrics_name)
    }

    /// Registers `data_object_path` in every window `[min, max]` spans.
    ///
    /// Windows are processed in ascending order, each with its own retry
    /// budget. A window that runs out of retries does not stop the
    /// remaining windows; the last such failure is returned once all
    /// windows were attempted. Cancellation stops immediately and leaves
    /// already-written windows in place.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidArgument`] for an empty path, or a tenant that is
    ///   empty or contains `/`
    /// - [`CoreError::InvalidTimeRange`] if `max < min`
    /// - [`CoreError::RetriesExhausted`] naming the last failed window
    /// - [`CoreError::Cancelled`] / [`CoreError::DeadlineExceeded`]
    pub fn update(
        &mut self,
        ctx: &Context,
        tenant: &str,
        data_object_path: &str,
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    ) -> CoreResult<()> {
        let started = Instant::now();
        self.metrics.record_update();
        let result = self.update_windows(ctx, tenant, data_object_path, min, max);
        self.metrics.observe_processing(started.elapsed());
        result
    }

    fn update_windows(
        &mut self,
        ctx: &Context,
        tenant: &str,
        data_object_path: &str,
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    ) -> CoreResult<()> {
        validate_tenant(tenant)?;
        if data_object_path.is_empty() {
            return Err(CoreError::invalid_argument(
                "data object path must not be empty",
            ));
        }

        let windows = self.planner.plan(tenant, min, max)?;
        let record = RegistrationRecord::new(data_object_path, min, max);
        record.validate()?;

        // The zero time means the caller has no real bound.
        if max != DateTime::<Utc>::default() {
            if let Ok(lag) = (Utc::now() - max).to_std() {
                self.metrics.observe_registration_lag(lag);
            }
        }

        let mut last_err = None;
        for window in windows {
            let path = window.path();
            let result = self.update_window(ctx, &path, &record);

            self.builder.reset();
            self.buf.clear();

            match result {
                Ok(()) => {}
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn update_window(
        &mut self,
        ctx: &Context,
        path: &str,
        record: &RegistrationRecord,
    ) -> CoreResult<()> {
        self.backoff.reset();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let err = match self.attempt(ctx, path, record) {
                Ok(generation) => {
                    info!(
                        metastore = path,
                        generation = %generation,
                        data_object = %record.data_object_path,
                        "successfully merged & updated metastore"
                    );
                    self.metrics.record_write(WriteStatus::Success);
                    return Ok(());
                }
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => e,
            };

            error!(
                metastore = path,
                attempt = attempts,
                error = %err,
                "failed to get and replace metastore object"
            );
            self.metrics.record_write(WriteStatus::Failure);

            if !err.is_retryable() {
                return Err(err);
            }
            if !self.backoff.ongoing() {
                warn!(metastore = path, attempts, "giving up on metastore window");
                self.metrics.record_exhausted();
                return Err(CoreError::RetriesExhausted {
                    path: path.to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }
            self.backoff.wait(ctx)?;
        }
    }

    /// One read-modify-write of `path`. Returns the new generation.
    fn attempt(
        &mut self,
        ctx: &Context,
        path: &str,
        record: &RegistrationRecord,
    ) -> CoreResult<Generation> {
        ctx.check()?;
        let read_started = Instant::now();
        let existing = self.store.read(path)?;

        self.builder.reset();
        let expected = match existing {
            Some(ObjectVersion { data, generation }) => {
                debug!(path, size = data.len(), "found existing metastore, updating");
                let stats = replay(
                    ctx,
                    path,
                    data,
                    &mut self.builder,
                    self.config.replay_batch_size,
                )?;
                self.metrics.record_replayed(stats.records);
                self.metrics.observe_replay(read_started.elapsed());
                Some(generation)
            }
            None => {
                debug!(path, "no existing metastore found, creating new one");
                None
            }
        };

        let encode_started = Instant::now();
        append_record(&mut self.builder, record)?;
        self.buf.clear();
        let mut writer = (&mut self.buf).writer();
        self.builder.flush(&mut writer).map_err(CoreError::Encode)?;
        let data = self.buf.split().freeze();
        self.metrics.observe_encoding(encode_started.elapsed());

        ctx.check()?;
        self.metrics.record_bytes_written(data.len());
        let generation = self.store.compare_and_replace(path, expected.as_ref(), data)?;
        Ok(generation)
    }
}

impl<S> std::fmt::Debug for Updater<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("config", &self.config)
            .field("metrics_name", &self.metrics_name)
            .finish_non_exhaustive()
    }
}
