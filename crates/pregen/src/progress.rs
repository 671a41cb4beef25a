//! Completion counting, sliding-window throughput and ETA.
//!
//! [`ProgressTracker::record`] is invoked once for every completed chunk,
//! from whichever task observed the completion. Counters are atomics that can
//! be read from anywhere without locking. The sliding window is a
//! [`VecDeque`] behind a short critical section: the timestamp is taken,
//! appended and trimmed under the same lock, so the window stays in
//! chronological order no matter how completions interleave.

use crate::{ChunkPos, Report, ReportSink, SystemClock, TimeSource};
use core::time::Duration;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::{collections::VecDeque, sync::Arc};

/// Point-in-time view of a task's progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub finished: u64,
    pub total: u64,
    pub percent: f64,
}

/// Percentage of `finished` over `total`. An empty region is complete.
pub(crate) fn percent(finished: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * finished as f64 / total as f64
    }
}

/// Tracks completions for one task and turns each into a [`Report`].
///
/// ## Invariants
/// - `finished <= total`, both monotonically non-decreasing during a run.
/// - The window only holds timestamps within `rate_window` of the most recent
///   completion, in non-decreasing order.
/// - Reports reach the sink in the order their completions were counted, so
///   an observer sees the processed count (and percentage) only go up.
pub struct ProgressTracker<T: TimeSource = SystemClock> {
    world: Arc<str>,
    finished: AtomicU64,
    total: AtomicU64,
    started_at: AtomicU64,
    window: Mutex<VecDeque<u64>>,
    window_millis: u64,
    clock: T,
}

impl<T: TimeSource> ProgressTracker<T> {
    pub fn new(world: Arc<str>, rate_window: Duration, clock: T) -> Self {
        Self {
            world,
            finished: AtomicU64::new(0),
            total: AtomicU64::new(0),
            started_at: AtomicU64::new(0),
            window: Mutex::new(VecDeque::new()),
            window_millis: rate_window.as_millis() as u64,
            clock,
        }
    }

    /// Prepares the tracker for a run over `total` chunks, `already_finished`
    /// of which were completed by an earlier run of the same task.
    pub fn reset(&self, total: u64, already_finished: u64) {
        let mut window = self.window.lock();
        window.clear();
        self.total.store(total, Ordering::Release);
        self.finished
            .store(already_finished.min(total), Ordering::Release);
        self.started_at
            .store(self.clock.current_millis(), Ordering::Release);
    }

    /// Counts one completed chunk, updates the rate window and sends the
    /// resulting report to `sink`.
    pub fn record(&self, pos: ChunkPos, sink: &dyn ReportSink) -> Report {
        let mut window = self.window.lock();

        // Readings are clamped to the tail so the window never goes backward.
        let tail = window.back().copied().unwrap_or(0);
        let now = self.clock.current_millis().max(tail);
        window.push_back(now);
        while window
            .front()
            .is_some_and(|&oldest| now - oldest > self.window_millis)
        {
            window.pop_front();
        }

        let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        let total = self.total.load(Ordering::Acquire);

        let report = if finished >= total {
            self.finished_report(finished, now)
        } else {
            // `now` itself is always in the window, so it is never empty.
            let oldest = window.front().copied().unwrap_or(now);
            // A zero span (first completion, or several in the same
            // millisecond) is floored to 1ms to keep the rate finite.
            let span_secs = (now - oldest).max(1) as f64 / 1e3;
            let rate = window.len() as f64 / span_secs;
            let left = total - finished;
            let eta = Duration::try_from_secs_f64(left as f64 / rate).unwrap_or(Duration::MAX);

            Report::Running {
                world: Arc::clone(&self.world),
                processed: finished,
                percent: percent(finished, total),
                eta,
                rate,
                current: pos,
            }
        };

        sink.report(&report);
        report
    }

    /// Emits the completion report for a run that has nothing left to do,
    /// such as an empty region or a task resumed after its last chunk.
    pub fn report_complete(&self, sink: &dyn ReportSink) -> Report {
        let _window = self.window.lock();
        let finished = self.finished.load(Ordering::Acquire);
        let report = self.finished_report(finished, self.clock.current_millis());
        sink.report(&report);
        report
    }

    fn finished_report(&self, finished: u64, now: u64) -> Report {
        let started = self.started_at.load(Ordering::Acquire);
        Report::Finished {
            world: Arc::clone(&self.world),
            processed: finished,
            percent: percent(finished, self.total.load(Ordering::Acquire)),
            elapsed: Duration::from_millis(now.saturating_sub(started)),
        }
    }

    pub fn world(&self) -> &Arc<str> {
        &self.world
    }

    pub fn finished(&self) -> u64 {
        self.finished.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn percent(&self) -> f64 {
        percent(self.finished(), self.total())
    }

    pub fn snapshot(&self) -> Progress {
        let total = self.total();
        let finished = self.finished();
        Progress {
            finished,
            total,
            percent: percent(finished, total),
        }
    }

    /// Copy of the current rate window, oldest first.
    pub fn window(&self) -> Vec<u64> {
        self.window.lock().iter().copied().collect()
    }
}
