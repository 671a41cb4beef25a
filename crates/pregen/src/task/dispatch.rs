//! The throttled dispatch loop.
//!
//! One loop runs per task. It pulls cells from the coordinate sequence,
//! records cells that already exist straight away, and issues a generation
//! request for every other cell while fewer than `concurrency` requests are
//! in flight. Each request is awaited on its own Tokio task (the completion
//! reaction), which records the chunk and then releases its slot.
//!
//! The loop never blocks: when saturated it sleeps for `poll_interval` and
//! checks again, so a cancellation is noticed within one tick. Once the
//! sequence is exhausted or the task is cancelled, the loop waits for every
//! in-flight request to land, polling every `drain_interval`, persists the
//! task if it was cancelled at any point before that, and finally leaves the
//! registry. Store calls run on Tokio's blocking pool.

use super::GenerationTask;
use crate::{ChunkPos, ChunkSource, Report, ReportSink, TaskRegistry, TaskStore, TimeSource};
use futures::future::BoxFuture;
use portable_atomic::Ordering;
use std::sync::Arc;
use tokio::{task::spawn_blocking, time::sleep};

/// Number of already-generated cells recorded back to back before the loop
/// yields to the scheduler.
const YIELD_EVERY: u32 = 64;

/// The external collaborators a run talks to.
#[derive(Clone)]
pub struct RunContext {
    pub source: Arc<dyn ChunkSource>,
    pub sink: Arc<dyn ReportSink>,
    pub store: Arc<dyn TaskStore>,
}

impl RunContext {
    pub fn new(
        source: Arc<dyn ChunkSource>,
        sink: Arc<dyn ReportSink>,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            source,
            sink,
            store,
        }
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The sequence was exhausted and every request landed or timed out.
    Completed { processed: u64, timed_out: u64 },
    /// The task was cancelled; its state was handed to the store. A cancel
    /// that arrives while the last requests drain still stops the task.
    Stopped { processed: u64 },
}

/// Removes the task from the registry when the run ends, however it ends.
struct Registration<'a, T: TimeSource> {
    registry: &'a TaskRegistry<T>,
    task: &'a Arc<GenerationTask<T>>,
}

impl<T: TimeSource> Drop for Registration<'_, T> {
    fn drop(&mut self) {
        if self.registry.remove_if(self.task) {
            #[cfg(feature = "tracing")]
            tracing::debug!(world = %self.task.world, "Task deregistered");
        }
    }
}

/// Holds one concurrency slot for the lifetime of a completion reaction.
///
/// Taken when the request is issued and moved into the spawned reaction, so
/// the slot is released on drop whether the reaction finishes, panics, or is
/// dropped unpolled by a shutting-down runtime.
struct Slot<T: TimeSource>(Arc<GenerationTask<T>>);

impl<T: TimeSource> Slot<T> {
    fn take(task: &Arc<GenerationTask<T>>) -> Self {
        task.in_flight.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(task))
    }
}

impl<T: TimeSource> Drop for Slot<T> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<T: TimeSource> GenerationTask<T> {
    /// Runs the task to completion or cancellation.
    ///
    /// Reports flow to `ctx.sink`, one per completed chunk. On cancellation
    /// the task's [`SavedTask`](crate::SavedTask) is written to `ctx.store`
    /// exactly once and a [`Report::Stopped`] follows. A task that completes
    /// clears any saved entry for its world. The task is removed from
    /// `registry` when this returns, and also if the future is dropped early.
    ///
    /// Store failures are logged, never returned: cancellation is not an
    /// error and the caller always gets an [`Outcome`].
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(world = %self.world)))]
    pub async fn run(self: Arc<Self>, ctx: RunContext, registry: TaskRegistry<T>) -> Outcome {
        let _registration = Registration {
            registry: &registry,
            task: &self,
        };

        let (total, resumed) = {
            let sequence = self.sequence.lock();
            (sequence.count(), sequence.emitted())
        };
        self.tracker.reset(total, resumed);

        #[cfg(feature = "tracing")]
        tracing::info!(
            total,
            resumed,
            concurrency = self.config.concurrency,
            "Task started"
        );

        if resumed == total {
            // Nothing to walk: an empty region, or a task saved after its
            // last cell was issued.
            self.tracker.report_complete(ctx.sink.as_ref());
            self.forget_saved(&ctx).await;
            return Outcome::Completed {
                processed: self.tracker.finished(),
                timed_out: 0,
            };
        }

        self.dispatch(&ctx).await;
        self.drain().await;

        let processed = self.tracker.finished();
        if self.is_cancelled() {
            self.persist(&ctx).await;
            ctx.sink.report(&Report::Stopped {
                world: Arc::clone(&self.world),
            });
            return Outcome::Stopped { processed };
        }

        let timed_out = self.timed_out();
        if timed_out > 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(timed_out, processed, total, "Task ended with abandoned chunks");
        } else {
            #[cfg(feature = "tracing")]
            tracing::info!(processed, "Task completed");
        }
        self.forget_saved(&ctx).await;
        Outcome::Completed {
            processed,
            timed_out,
        }
    }

    /// Issues requests until the sequence is exhausted or the task is
    /// cancelled.
    async fn dispatch(self: &Arc<Self>, ctx: &RunContext) {
        let cap = self.config.concurrency.max(1);
        let mut inline = 0_u32;

        while !self.is_cancelled() {
            if self.in_flight.load(Ordering::Acquire) >= cap {
                sleep(self.config.poll_interval).await;
                continue;
            }

            let Some(pos) = self.next_cell() else {
                break;
            };

            if ctx.source.is_generated(&self.world, pos) {
                self.tracker.record(pos, ctx.sink.as_ref());
                inline += 1;
                if inline % YIELD_EVERY == 0 {
                    tokio::task::yield_now().await;
                }
                continue;
            }

            self.issue(pos, ctx);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            cancelled = self.is_cancelled(),
            in_flight = self.in_flight(),
            "Dispatch loop exited"
        );
    }

    /// Takes a slot, sends the request and spawns its completion reaction.
    pub(super) fn issue(self: &Arc<Self>, pos: ChunkPos, ctx: &RunContext) {
        let request = ctx.source.generate(&self.world, pos);
        // Only this loop takes slots, so taking one here, before the reaction
        // exists, keeps the count at or below the cap.
        let slot = Slot::take(self);
        let sink = Arc::clone(&ctx.sink);

        tokio::spawn(async move {
            slot.0.complete(pos, request, sink.as_ref()).await;
            drop(slot);
        });
    }

    /// Completion reaction for one request. Runs while the caller still holds
    /// the slot, so the drain cannot finish ahead of the last report.
    #[allow(clippy::used_underscore_binding)]
    async fn complete(
        &self,
        _pos: ChunkPos,
        request: BoxFuture<'static, ChunkPos>,
        sink: &dyn ReportSink,
    ) {
        let generated = match self.config.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.ok(),
            None => Some(request.await),
        };

        match generated {
            Some(chunk) => {
                self.tracker.record(chunk, sink);
            }
            None => {
                self.timed_out.fetch_add(1, Ordering::AcqRel);
                #[cfg(feature = "tracing")]
                tracing::warn!(world = %self.world, x = _pos.x, z = _pos.z, "Generation request timed out");
            }
        }
    }

    /// Waits for every in-flight request to land.
    async fn drain(&self) {
        #[cfg(feature = "tracing")]
        if self.in_flight() > 0 {
            tracing::debug!(in_flight = self.in_flight(), "Draining in-flight requests");
        }

        while self.in_flight.load(Ordering::Acquire) > 0 {
            sleep(self.config.drain_interval).await;
        }
    }

    /// Hands the task's state to the store on the blocking pool.
    #[allow(clippy::used_underscore_binding)]
    async fn persist(&self, ctx: &RunContext) {
        let saved = self.saved_state();
        let _cursor = saved.cursor.index;
        let store = Arc::clone(&ctx.store);

        match spawn_blocking(move || store.save(&saved)).await {
            Ok(Ok(())) => {
                #[cfg(feature = "tracing")]
                tracing::info!(cursor = _cursor, "Task state saved");
            }
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to save task state: {_e}");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Task store panicked while saving: {_e}");
            }
        }
    }

    async fn forget_saved(&self, ctx: &RunContext) {
        let world = Arc::clone(&self.world);
        let store = Arc::clone(&ctx.store);

        match spawn_blocking(move || store.remove(&world)).await {
            Ok(Ok(())) => {}
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to clear saved task state: {_e}");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Task store panicked while clearing state: {_e}");
            }
        }
    }
}
