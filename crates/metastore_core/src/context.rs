//! Cancellation and deadlines for blocking operations.

use crate::error::{CoreError, CoreResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Shared {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Carries a cancel flag and an optional deadline into blocking calls.
///
/// Clones share the cancel flag: cancelling any clone cancels all of them,
/// which is how another thread stops an in-flight update. Waits performed
/// through [`Context::wait`] wake immediately on cancellation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    shared: Arc<Shared>,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context that is never cancelled unless [`cancel`] is called.
    ///
    /// [`cancel`]: Context::cancel
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a deadline `timeout` from now.
    ///
    /// A timeout too large to be represented as an [`Instant`] leaves the
    /// context without a deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        let mut cancelled = self.shared.cancelled.lock();
        *cancelled = true;
        self.shared.wake.notify_all();
    }

    /// Returns true once [`cancel`](Context::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.shared.cancelled.lock()
    }

    /// Fails if the context is cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// [`CoreError::Cancelled`] or [`CoreError::DeadlineExceeded`].
    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CoreError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Blocks for `duration`, returning early with an error on cancellation
    /// or when the deadline passes.
    ///
    /// # Errors
    ///
    /// [`CoreError::Cancelled`] or [`CoreError::DeadlineExceeded`].
    pub fn wait(&self, duration: Duration) -> CoreResult<()> {
        // None: the wait outlasts any representable instant.
        let wake_at = Instant::now().checked_add(duration);
        let mut cancelled = self.shared.cancelled.lock();
        loop {
            if *cancelled {
                return Err(CoreError::Cancelled);
            }
            let now = Instant::now();
            if self.deadline.is_some_and(|d| now >= d) {
                return Err(CoreError::DeadlineExceeded);
            }
            if wake_at.is_some_and(|w| now >= w) {
                return Ok(());
            }
            let until = match (self.deadline, wake_at) {
                (Some(d), Some(w)) => Some(d.min(w)),
                (Some(d), None) => Some(d),
                (None, w) => w,
            };
            match until {
                Some(until) => {
                    self.shared.wake.wait_until(&mut cancelled, until);
                }
                None => self.shared.wake.wait(&mut cancelled),
            }
        }
    }
}
