//! Throttled, resumable bulk pre-generation of world chunks.
//!
//! A [`GenerationTask`] walks every cell of a square [`Region`] in a fixed
//! order and asks a [`ChunkSource`] to generate the ones that do not exist
//! yet, keeping at most [`TaskConfig::concurrency`] requests in flight. Every
//! completion is counted by a [`ProgressTracker`], which estimates throughput
//! and ETA over a sliding window and sends one [`Report`] per chunk to a
//! [`ReportSink`].
//!
//! Cancelling a task stops new requests, waits for the in-flight ones to land
//! and hands the task's [`SavedTask`] to a [`TaskStore`] so that
//! [`GenerationTask::from_saved`] can pick up exactly where it stopped. Live
//! tasks are tracked per world by a [`TaskRegistry`].
//!
//! ## Modules
//!
//! - [`region`] / [`sequence`]: the cells of a region and their resumable
//!   enumeration.
//! - [`progress`] / [`report`]: counting, rate estimation and status lines.
//! - [`task`]: task lifecycle and the dispatch loop.
//! - [`registry`]: the per-world index of running tasks.
//! - [`source`] / [`store`]: the generation backend and persistence contracts.
//!
//! ## Features
//!
//! - `tracing`: emit lifecycle events (start, cancellation, drain,
//!   persistence, deregistration) through the `tracing` crate and enable
//!   [`LogSink`].

mod config;
mod error;
pub mod progress;
pub mod region;
pub mod registry;
pub mod report;
pub mod sequence;
pub mod source;
pub mod store;
pub mod task;
mod time;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::progress::{Progress, ProgressTracker};
pub use crate::region::{ChunkPos, Region};
pub use crate::registry::TaskRegistry;
#[cfg(feature = "tracing")]
pub use crate::report::LogSink;
pub use crate::report::{ConsoleSink, Report, ReportSink};
pub use crate::sequence::{CoordinateSequence, Cursor};
pub use crate::source::ChunkSource;
pub use crate::store::{JsonFileStore, MemoryStore, SavedTask, TaskStore};
pub use crate::task::{GenerationTask, Outcome, RunContext};
pub use crate::time::{SystemClock, TimeSource};
