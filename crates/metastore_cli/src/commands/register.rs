//! Register command implementation.

use super::{emit, Settings};
use crate::error::CliResult;
use crate::Format;
use chrono::{DateTime, Utc};
use metastore_core::{BackoffConfig, Context, MetricsSnapshot, Updater};
use metastore_storage::ObjectStore;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Arguments of the register command.
#[derive(Debug, Clone)]
pub struct RegisterArgs {
    /// Tenant owning the data object.
    pub tenant: String,
    /// Storage path of the data object.
    pub path: String,
    /// Earliest timestamp in the data object.
    pub min: DateTime<Utc>,
    /// Latest timestamp in the data object.
    pub max: DateTime<Utc>,
    /// Retries per window.
    pub max_retries: u32,
    /// Overall deadline.
    pub timeout: Option<Duration>,
}

/// Registration result.
#[derive(Debug, Serialize)]
pub struct RegisterResult {
    /// Registered data object.
    pub data_object: String,
    /// Metastore objects written.
    pub windows: Vec<String>,
    /// Updater metrics after the call.
    pub metrics: MetricsSnapshot,
}

/// Runs the register command.
pub fn run(settings: &Settings, args: &RegisterArgs, format: Format) -> CliResult<()> {
    let store = settings.open_store("register")?;
    let result = register(store, settings, args)?;
    emit(format, &result, |r| {
        println!("Registered {} in {} window(s):", r.data_object, r.windows.len());
        for window in &r.windows {
            println!("  {window}");
        }
    })
}

/// Registers the data object described by `args` in `store`.
pub fn register<S: ObjectStore>(
    store: S,
    settings: &Settings,
    args: &RegisterArgs,
) -> CliResult<RegisterResult> {
    let config = settings
        .config()
        .with_backoff(BackoffConfig::default().with_max_retries(args.max_retries));
    let mut updater = Updater::new(store, config)?;

    let ctx = match args.timeout {
        Some(timeout) => Context::new().with_timeout(timeout),
        None => Context::new(),
    };
    updater.update(&ctx, &args.tenant, &args.path, args.min, args.max)?;

    let windows = updater
        .planner()
        .plan(&args.tenant, args.min, args.max)?
        .map(|w| w.path())
        .collect();
    info!(data_object = %args.path, tenant = %args.tenant, "registered data object");

    Ok(RegisterResult {
        data_object: args.path.clone(),
        windows,
        metrics: updater.metrics().snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use metastore_testkit::{at, TempFileStore};

    #[test]
    fn registers_into_spanned_windows() {
        let store = TempFileStore::new();
        let settings = Settings {
            root: Some(store.path().to_path_buf()),
            window_size: Duration::from_secs(3600),
        };
        let args = RegisterArgs {
            tenant: "t1".into(),
            path: "obj-2".into(),
            min: at(0, 50),
            max: at(1, 20),
            max_retries: 0,
            timeout: None,
        };

        let result = register(&*store, &settings, &args).unwrap();
        assert_eq!(
            result.windows,
            vec![
                "tenant-t1/metastore/2024-01-01T00:00:00Z.store",
                "tenant-t1/metastore/2024-01-01T01:00:00Z.store",
            ]
        );
        assert_eq!(result.metrics.window_writes_success, 2);
        assert_eq!(store.list("tenant-t1/").unwrap().len(), 2);
    }

    #[test]
    fn huge_timeout_registers_without_deadline() {
        let store = TempFileStore::new();
        let settings = Settings {
            root: Some(store.path().to_path_buf()),
            window_size: Duration::from_secs(3600),
        };
        let args = RegisterArgs {
            tenant: "t1".into(),
            path: "obj-1".into(),
            min: at(0, 10),
            max: at(0, 45),
            max_retries: 0,
            timeout: Some(Duration::from_secs(u64::MAX)),
        };

        let result = register(&*store, &settings, &args).unwrap();
        assert_eq!(result.windows.len(), 1);
    }
}
