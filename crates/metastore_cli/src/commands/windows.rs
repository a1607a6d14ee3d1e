//! Windows command implementation.

use super::{emit, Settings};
use crate::error::CliResult;
use crate::Format;
use chrono::{DateTime, Utc};
use metastore_core::WindowPlanner;
use serde::Serialize;

/// One planned window.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WindowInfo {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
    /// Metastore object path.
    pub path: String,
}

/// Runs the windows command. Needs no object store.
pub fn run(
    settings: &Settings,
    tenant: &str,
    min: DateTime<Utc>,
    max: DateTime<Utc>,
    format: Format,
) -> CliResult<()> {
    let windows = plan(settings, tenant, min, max)?;
    emit(format, &windows, |windows| {
        for w in windows {
            println!("{}  [{} .. {})", w.path, w.start.to_rfc3339(), w.end.to_rfc3339());
        }
    })
}

/// Plans the windows of `[min, max]`.
pub fn plan(
    settings: &Settings,
    tenant: &str,
    min: DateTime<Utc>,
    max: DateTime<Utc>,
) -> CliResult<Vec<WindowInfo>> {
    let planner = WindowPlanner::new(settings.window_size)?;
    Ok(planner
        .plan(tenant, min, max)?
        .map(|w| WindowInfo {
            start: w.start(),
            end: w.end(),
            path: w.path(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metastore_testkit::at;
    use std::time::Duration;

    #[test]
    fn plans_without_store() {
        let settings = Settings {
            root: None,
            window_size: Duration::from_secs(3600),
        };
        let windows = plan(&settings, "t1", at(0, 50), at(2, 0)).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].start, at(2, 0));
        assert_eq!(windows[0].end, at(1, 0));
    }

    #[test]
    fn reversed_range_fails() {
        let settings = Settings {
            root: None,
            window_size: Duration::from_secs(3600),
        };
        assert!(plan(&settings, "t1", at(2, 0), at(1, 0)).is_err());
    }

    #[test]
    fn oversized_window_fails() {
        let settings = Settings {
            root: None,
            window_size: Duration::from_secs(1 << 60),
        };
        assert!(plan(&settings, "t1", at(0, 0), at(1, 0)).is_err());
    }
}
