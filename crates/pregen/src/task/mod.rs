//! A single pre-generation task and its lifecycle.
//!
//! [`GenerationTask`] owns everything that describes one run over a region:
//! the coordinate sequence, the progress tracker, the cancellation token and
//! the in-flight counter. The dispatch loop itself lives in
//! [`dispatch`](self::dispatch) and is started through
//! [`TaskRegistry::start`](crate::TaskRegistry::start).

mod dispatch;

pub use dispatch::{Outcome, RunContext};

use crate::{
    ChunkPos, CoordinateSequence, Cursor, Progress, ProgressTracker, Region, Result, SavedTask,
    SystemClock, TaskConfig, TimeSource,
};
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Bulk generation of every chunk in a [`Region`] of one world.
///
/// A task is identified by its world: a [`TaskRegistry`] holds at most one
/// live task per world. Once running, the only way to influence a task from
/// outside is [`Self::cancel`]; everything else is read-only.
///
/// [`TaskRegistry`]: crate::TaskRegistry
pub struct GenerationTask<T: TimeSource = SystemClock> {
    world: Arc<str>,
    region: Region,
    sequence: Mutex<CoordinateSequence>,
    tracker: ProgressTracker<T>,
    config: TaskConfig,
    cancel: CancellationToken,
    in_flight: AtomicUsize,
    timed_out: AtomicU64,
}

impl GenerationTask<SystemClock> {
    /// Creates a task that will walk `region` from its first cell. A region
    /// past the `i32` grid is rejected when the task is started.
    ///
    /// # Example
    /// ```
    /// use pregen::{ChunkPos, GenerationTask, Region, TaskConfig};
    ///
    /// let task = GenerationTask::new("overworld", Region::new(ChunkPos::new(0, 0), 2), TaskConfig::default());
    /// assert_eq!(task.world(), "overworld");
    /// assert_eq!(task.radius(), 2);
    /// assert_eq!(task.cursor().index, 0);
    /// ```
    pub fn new(world: impl Into<Arc<str>>, region: Region, config: TaskConfig) -> Self {
        Self::with_clock(world, CoordinateSequence::new(region), config, SystemClock::new())
    }

    /// Rebuilds a task stopped by an earlier run. Cells before the saved
    /// cursor are not requested again and count as finished.
    ///
    /// # Errors
    ///
    /// - [`Error::RegionOutOfBounds`](crate::Error::RegionOutOfBounds) if the
    ///   saved region reaches past the `i32` grid.
    /// - [`Error::InvalidCursor`](crate::Error::InvalidCursor) if the saved
    ///   cursor does not fit the saved region.
    pub fn from_saved(saved: &SavedTask, config: TaskConfig) -> Result<Self> {
        let sequence = CoordinateSequence::resume(saved.region(), saved.cursor)?;
        Ok(Self::with_clock(
            saved.world.as_str(),
            sequence,
            config,
            SystemClock::new(),
        ))
    }
}

impl<T: TimeSource> GenerationTask<T> {
    /// Creates a task over `sequence` that measures time with `clock`.
    pub fn with_clock(
        world: impl Into<Arc<str>>,
        sequence: CoordinateSequence,
        config: TaskConfig,
        clock: T,
    ) -> Self {
        let world = world.into();
        Self {
            tracker: ProgressTracker::new(Arc::clone(&world), config.rate_window, clock),
            world,
            region: *sequence.region(),
            sequence: Mutex::new(sequence),
            config,
            cancel: CancellationToken::new(),
            in_flight: AtomicUsize::new(0),
            timed_out: AtomicU64::new(0),
        }
    }

    /// Asks the task to stop.
    ///
    /// No new requests are issued once the dispatch loop observes the flag;
    /// requests already in flight are allowed to finish, after which the
    /// task's state is persisted. Safe to call any number of times from any
    /// thread.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::info!(world = %self.world, "Cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn world_id(&self) -> &Arc<str> {
        &self.world
    }

    pub const fn region(&self) -> &Region {
        &self.region
    }

    pub const fn center(&self) -> ChunkPos {
        self.region.center()
    }

    pub const fn radius(&self) -> i32 {
        self.region.radius()
    }

    pub const fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Current position of the coordinate sequence.
    pub fn cursor(&self) -> Cursor {
        self.sequence.lock().cursor()
    }

    /// Copy of the coordinate sequence at its current position.
    pub fn sequence(&self) -> CoordinateSequence {
        self.sequence.lock().clone()
    }

    /// Number of generation requests issued whose completion has not been
    /// observed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of requests abandoned after exceeding
    /// [`TaskConfig::generation_timeout`].
    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> Progress {
        self.tracker.snapshot()
    }

    pub const fn tracker(&self) -> &ProgressTracker<T> {
        &self.tracker
    }

    /// The state a [`TaskStore`](crate::TaskStore) needs to resume this task.
    pub fn saved_state(&self) -> SavedTask {
        SavedTask {
            world: self.world.to_string(),
            center: self.center(),
            radius: self.radius(),
            cursor: self.cursor(),
        }
    }

    fn next_cell(&self) -> Option<ChunkPos> {
        self.sequence.lock().next()
    }
}
