//! Updater configuration.

use crate::backoff::BackoffConfig;
use crate::error::{CoreError, CoreResult};
use chrono::TimeDelta;
use metastore_codec::BuilderConfig;
use std::time::Duration;

/// Default metastore window size.
pub const DEFAULT_WINDOW_SIZE: Duration = Duration::from_secs(12 * 60 * 60);

/// Default number of records read per replay batch.
pub const DEFAULT_REPLAY_BATCH_SIZE: usize = 100;

/// Configuration for an [`Updater`](crate::Updater).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Size of each metastore time window.
    pub window_size: Duration,
    /// Retry settings applied per window.
    pub backoff: BackoffConfig,
    /// Builder size targets.
    pub builder: BuilderConfig,
    /// Records read per batch when replaying existing content.
    pub replay_batch_size: usize,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            backoff: BackoffConfig::default(),
            builder: BuilderConfig::default(),
            replay_batch_size: DEFAULT_REPLAY_BATCH_SIZE,
        }
    }
}

impl UpdaterConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the window size.
    #[must_use]
    pub fn with_window_size(mut self, size: Duration) -> Self {
        self.window_size = size;
        self
    }

    /// Sets the backoff configuration.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the builder configuration.
    #[must_use]
    pub fn with_builder(mut self, builder: BuilderConfig) -> Self {
        self.builder = builder;
        self
    }

    /// Sets the replay batch size.
    #[must_use]
    pub fn with_replay_batch_size(mut self, size: usize) -> Self {
        self.replay_batch_size = size;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> CoreResult<()> {
        if self.window_size.is_zero() {
            return Err(CoreError::invalid_config("window_size must be positive"));
        }
        if self.window_size.subsec_nanos() != 0 {
            return Err(CoreError::invalid_config(
                "window_size must be a whole number of seconds",
            ));
        }
        let fits = i64::try_from(self.window_size.as_secs())
            .ok()
            .and_then(TimeDelta::try_seconds)
            .is_some();
        if !fits {
            return Err(CoreError::invalid_config("window_size is too large"));
        }
        if self.replay_batch_size == 0 {
            return Err(CoreError::invalid_config(
                "replay_batch_size must be positive",
            ));
        }
        if self.backoff.min_backoff > self.backoff.max_backoff {
            return Err(CoreError::invalid_config(
                "min_backoff must not exceed max_backoff",
            ));
        }
        self.builder
            .validate()
            .map_err(|e| CoreError::invalid_config(e.to_string()))
    }
}
