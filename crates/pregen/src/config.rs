use crate::{Error, Result};
use core::time::Duration;

/// Default number of generation requests allowed in flight per task.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Default pause between checks when the task is at its concurrency cap.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default pause between checks while waiting for in-flight requests to land.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_millis(5);

/// Default horizon of the sliding window used for rate estimation.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(10);

/// Tuning knobs for a single [`GenerationTask`](crate::GenerationTask).
///
/// The defaults keep at most 50 requests in flight and estimate throughput
/// over the trailing ten seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskConfig {
    /// Maximum number of generation requests in flight at any instant.
    pub concurrency: usize,

    /// How long the dispatcher sleeps when it is at the concurrency cap
    /// before checking again for a free slot or a cancellation.
    pub poll_interval: Duration,

    /// How long the dispatcher sleeps between checks while draining.
    pub drain_interval: Duration,

    /// Completions older than this are evicted from the rate window.
    pub rate_window: Duration,

    /// Releases the slot of a request that has not resolved within this
    /// duration. The chunk is logged and counted as timed out, never as
    /// finished. `None` waits forever.
    pub generation_timeout: Option<Duration>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            rate_window: DEFAULT_RATE_WINDOW,
            generation_timeout: None,
        }
    }
}

impl TaskConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    pub fn with_rate_window(mut self, window: Duration) -> Self {
        self.rate_window = window;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Checks that every value is usable by the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the concurrency cap is zero, an
    /// interval is zero, or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(invalid("concurrency must be greater than 0"));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("poll interval must be greater than 0"));
        }
        if self.drain_interval.is_zero() {
            return Err(invalid("drain interval must be greater than 0"));
        }
        if self.rate_window.as_millis() == 0 {
            return Err(invalid("rate window must be at least 1ms"));
        }
        if self.generation_timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid("generation timeout must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> Error {
    Error::InvalidConfig {
        reason: reason.to_string(),
    }
}
