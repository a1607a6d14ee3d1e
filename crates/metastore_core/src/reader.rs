//! Metastore read path.

use crate::config::UpdaterConfig;
use crate::context::Context;
use crate::error::CoreResult;
use crate::record::RegistrationRecord;
use crate::replay::visit_streams;
use crate::window::{validate_tenant, WindowPlanner};
use chrono::{DateTime, Utc};
use metastore_storage::ObjectStore;
use std::collections::HashSet;
use tracing::debug;

/// Finds data objects through the metastore.
///
/// Must be configured with the same window size the writers use.
#[derive(Debug)]
pub struct MetastoreReader<S> {
    store: S,
    planner: WindowPlanner,
    batch_size: usize,
}

impl<S: ObjectStore> MetastoreReader<S> {
    /// Creates a reader using the window size and batch size of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidConfig`] if `config` fails validation.
    pub fn new(store: S, config: &UpdaterConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            planner: WindowPlanner::new(config.window_size)?,
            batch_size: config.replay_batch_size,
        })
    }

    /// Returns the window planner.
    pub fn planner(&self) -> &WindowPlanner {
        &self.planner
    }

    /// Returns every record stored at `window_path`, in stored order.
    ///
    /// A window that does not exist yet has no records.
    ///
    /// # Errors
    ///
    /// Returns storage, decode, record or cancellation errors.
    pub fn records_in_window(
        &self,
        ctx: &Context,
        window_path: &str,
    ) -> CoreResult<Vec<RegistrationRecord>> {
        ctx.check()?;
        let Some(version) = self.store.read(window_path)? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        visit_streams(ctx, window_path, version.data, self.batch_size, |row| {
            records.push(RegistrationRecord::from_labels(&row.labels)?);
            Ok(())
        })?;
        Ok(records)
    }

    /// Returns paths of data objects whose time range overlaps
    /// `[start, end]`, deduplicated, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidArgument`] for a malformed tenant,
    /// [`crate::CoreError::InvalidTimeRange`] if `end < start`, or any error
    /// from [`records_in_window`](Self::records_in_window).
    pub fn list_data_objects(
        &self,
        ctx: &Context,
        tenant: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<String>> {
        validate_tenant(tenant)?;

        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for window in self.planner.plan(tenant, start, end)? {
            let window_path = window.path();
            let records = self.records_in_window(ctx, &window_path)?;
            debug!(metastore = %window_path, records = records.len(), "read metastore window");
            for record in records {
                if record.overlaps(start, end) && seen.insert(record.data_object_path.clone()) {
                    paths.push(record.data_object_path);
                }
            }
        }
        Ok(paths)
    }

    /// Lists the metastore objects stored for `tenant`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidArgument`] for a malformed tenant,
    /// or storage errors.
    pub fn window_paths(&self, tenant: &str) -> CoreResult<Vec<String>> {
        validate_tenant(tenant)?;
        Ok(self.store.list(&format!("tenant-{tenant}/metastore/"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::Updater;
    use metastore_storage::InMemoryObjectStore;
    use metastore_testkit::at;
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> UpdaterConfig {
        UpdaterConfig::default().with_window_size(Duration::from_secs(3600))
    }

    fn populated() -> Arc<InMemoryObjectStore> {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut updater = Updater::new(Arc::clone(&store), config()).unwrap();
        let ctx = Context::new();
        updater.update(&ctx, "t1", "obj-1", at(0, 10), at(0, 45)).unwrap();
        updater.update(&ctx, "t1", "obj-2", at(0, 50), at(1, 20)).unwrap();
        updater.update(&ctx, "t1", "obj-3", at(3, 0), at(3, 30)).unwrap();
        updater.update(&ctx, "t2", "obj-9", at(0, 0), at(0, 5)).unwrap();
        store
    }

    #[test]
    fn missing_window_has_no_records() {
        let reader = MetastoreReader::new(InMemoryObjectStore::new(), &config()).unwrap();
        let records = reader
            .records_in_window(&Context::new(), "tenant-x/metastore/2024-01-01T00:00:00Z.store")
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn lists_overlapping_objects_once() {
        let reader = MetastoreReader::new(populated(), &config()).unwrap();
        let ctx = Context::new();

        assert_eq!(
            reader.list_data_objects(&ctx, "t1", at(0, 0), at(2, 0)).unwrap(),
            vec!["obj-1", "obj-2"]
        );
        assert_eq!(
            reader.list_data_objects(&ctx, "t1", at(1, 0), at(1, 10)).unwrap(),
            vec!["obj-2"]
        );
        assert_eq!(
            reader.list_data_objects(&ctx, "t1", at(0, 46), at(0, 49)).unwrap(),
            Vec::<String>::new()
        );
        assert_eq!(
            reader.list_data_objects(&ctx, "t2", at(0, 0), at(5, 0)).unwrap(),
            vec!["obj-9"]
        );
    }

    #[test]
    fn window_paths_are_per_tenant() {
        let reader = MetastoreReader::new(populated(), &config()).unwrap();
        assert_eq!(
            reader.window_paths("t1").unwrap(),
            vec![
                "tenant-t1/metastore/2024-01-01T00:00:00Z.store",
                "tenant-t1/metastore/2024-01-01T01:00:00Z.store",
                "tenant-t1/metastore/2024-01-01T03:00:00Z.store",
            ]
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        let reader = MetastoreReader::new(populated(), &config()).unwrap();
        assert!(matches!(
            reader.list_data_objects(&Context::new(), "t1", at(2, 0), at(1, 0)),
            Err(CoreError::InvalidTimeRange { .. })
        ));
    }
}
