//! Query command implementation.

use super::{emit, Settings};
use crate::error::CliResult;
use crate::Format;
use chrono::{DateTime, Utc};
use metastore_core::{Context, MetastoreReader};
use metastore_storage::ObjectStore;
use serde::Serialize;

/// Query result.
#[derive(Debug, Serialize)]
pub struct QueryResult {
    /// Tenant queried.
    pub tenant: String,
    /// Range start.
    pub start: DateTime<Utc>,
    /// Range end.
    pub end: DateTime<Utc>,
    /// Data objects overlapping the range.
    pub data_objects: Vec<String>,
}

/// Runs the query command.
pub fn run(
    settings: &Settings,
    tenant: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    format: Format,
) -> CliResult<()> {
    let store = settings.open_store("query")?;
    let result = query(store, settings, tenant, start, end)?;
    emit(format, &result, |r| {
        for path in &r.data_objects {
            println!("{path}");
        }
    })
}

/// Lists data objects of `tenant` overlapping `[start, end]`.
pub fn query<S: ObjectStore>(
    store: S,
    settings: &Settings,
    tenant: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CliResult<QueryResult> {
    let reader = MetastoreReader::new(store, &settings.config())?;
    let data_objects = reader.list_data_objects(&Context::new(), tenant, start, end)?;
    Ok(QueryResult {
        tenant: tenant.to_string(),
        start,
        end,
        data_objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::register::{register, RegisterArgs};
    use metastore_testkit::{at, TempFileStore};
    use std::time::Duration;

    #[test]
    fn finds_registered_objects() {
        let store = TempFileStore::new();
        let settings = Settings {
            root: Some(store.path().to_path_buf()),
            window_size: Duration::from_secs(3600),
        };
        for (path, min, max) in [
            ("obj-1", at(0, 10), at(0, 45)),
            ("obj-2", at(0, 50), at(1, 20)),
        ] {
            let args = RegisterArgs {
                tenant: "t1".into(),
                path: path.into(),
                min,
                max,
                max_retries: 0,
                timeout: None,
            };
            register(&*store, &settings, &args).unwrap();
        }

        let result = query(&*store, &settings, "t1", at(1, 0), at(1, 30)).unwrap();
        assert_eq!(result.data_objects, vec!["obj-2"]);

        let result = query(&*store, &settings, "t1", at(0, 0), at(0, 30)).unwrap();
        assert_eq!(result.data_objects, vec!["obj-1"]);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data_objects"][0], "obj-1");
    }
}
