//! Window planning.
//!
//! Metastore objects are partitioned into fixed-size time windows aligned
//! to the Unix epoch. The window a timestamp belongs to depends only on the
//! tenant, the timestamp and the window size, so every writer and reader
//! computes the same paths without coordination.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;

/// Checks that `tenant` names exactly one `tenant-{tenant}/` directory.
pub(crate) fn validate_tenant(tenant: &str) -> CoreResult<()> {
    if tenant.is_empty() {
        return Err(CoreError::invalid_argument("tenant must not be empty"));
    }
    if tenant.contains('/') {
        return Err(CoreError::invalid_argument(format!(
            "tenant {tenant:?} must not contain '/'"
        )));
    }
    Ok(())
}

/// One epoch-aligned time window of a tenant's metastore.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Window {
    tenant: String,
    start: DateTime<Utc>,
    size_secs: i64,
}

impl Window {
    /// Tenant owning the window.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Inclusive window start.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive window end, saturating at the latest representable time.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        TimeDelta::try_seconds(self.size_secs)
            .and_then(|size| self.start.checked_add_signed(size))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns true if `ts` falls inside the window.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end()
    }

    /// Storage path of the window's metastore object.
    ///
    /// `tenant-{tenant}/metastore/{start}.store`, start in RFC 3339 UTC with
    /// second precision.
    #[must_use]
    pub fn path(&self) -> String {
        format!(
            "tenant-{}/metastore/{}.store",
            self.tenant,
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Maps time ranges to the windows they span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    size_secs: i64,
}

impl WindowPlanner {
    /// Creates a planner for windows of `window_size`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] unless the size is a positive
    /// whole number of seconds that fits in a [`TimeDelta`].
    pub fn new(window_size: Duration) -> CoreResult<Self> {
        if window_size.is_zero() || window_size.subsec_nanos() != 0 {
            return Err(CoreError::invalid_config(
                "window size must be a positive whole number of seconds",
            ));
        }
        let size_secs = i64::try_from(window_size.as_secs())
            .ok()
            .filter(|secs| TimeDelta::try_seconds(*secs).is_some())
            .ok_or_else(|| CoreError::invalid_config("window size is too large"))?;
        Ok(Self { size_secs })
    }

    /// Window size.
    #[must_use]
    pub fn window_size(&self) -> Duration {
        Duration::from_secs(self.size_secs.unsigned_abs())
    }

    /// Start of the window containing `ts`, as Unix seconds.
    fn align(&self, ts: DateTime<Utc>) -> i64 {
        ts.timestamp().div_euclid(self.size_secs) * self.size_secs
    }

    /// Returns the window containing `ts`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the aligned start falls
    /// outside the representable time range.
    pub fn window_for(&self, tenant: &str, ts: DateTime<Utc>) -> CoreResult<Window> {
        let secs = self.align(ts);
        let start = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::invalid_argument("timestamp out of range"))?;
        Ok(Window {
            tenant: tenant.to_string(),
            start,
            size_secs: self.size_secs,
        })
    }

    /// Plans the windows spanned by `[min, max]`, both ends inclusive.
    ///
    /// The result is ascending and free of duplicates; `min == max` yields
    /// one window.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeRange`] if `max < min`.
    pub fn plan(&self, tenant: &str, min: DateTime<Utc>, max: DateTime<Utc>) -> CoreResult<Windows> {
        if max < min {
            return Err(CoreError::InvalidTimeRange { min, max });
        }
        Ok(Windows {
            tenant: tenant.to_string(),
            size_secs: self.size_secs,
            next: Some(self.align(min)),
            last: self.align(max),
        })
    }
}

/// Lazy, restartable sequence of windows produced by [`WindowPlanner::plan`].
///
/// Clone it to iterate again from the beginning of the remaining range.
#[derive(Debug, Clone)]
pub struct Windows {
    tenant: String,
    size_secs: i64,
    next: Option<i64>,
    last: i64,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let secs = self.next?;
        if secs > self.last {
            self.next = None;
            return None;
        }
        self.next = secs.checked_add(self.size_secs);
        let Some(start) = DateTime::from_timestamp(secs, 0) else {
            self.next = None;
            return None;
        };
        Some(Window {
            tenant: self.tenant.clone(),
            start,
            size_secs: self.size_secs,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(next) if next <= self.last => {
                let n = usize::try_from((self.last - next) / self.size_secs + 1).ok();
                (n.unwrap_or(usize::MAX), n)
            }
            _ => (0, Some(0)),
        }
    }
}

impl std::iter::FusedIterator for Windows {}
