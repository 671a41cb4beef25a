//! Status lines emitted while a task runs.
//!
//! Every completed chunk produces exactly one [`Report`]: a
//! [`Report::Running`] update while chunks remain, or a single
//! [`Report::Finished`] once the last one lands. A cancelled task ends with
//! [`Report::Stopped`] after its in-flight requests have drained.

use crate::ChunkPos;
use core::{fmt, time::Duration};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A single status line for the output sink.
#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    /// Progress update after a chunk completed and more remain.
    Running {
        world: Arc<str>,
        processed: u64,
        percent: f64,
        eta: Duration,
        /// Completions per second over the sliding window.
        rate: f64,
        current: ChunkPos,
    },
    /// Every chunk of the region has completed.
    Finished {
        world: Arc<str>,
        processed: u64,
        percent: f64,
        elapsed: Duration,
    },
    /// The task was cancelled and its state persisted.
    Stopped { world: Arc<str> },
}

impl Report {
    pub fn world(&self) -> &str {
        match self {
            Self::Running { world, .. } | Self::Finished { world, .. } | Self::Stopped { world } => {
                world
            }
        }
    }

    /// Percentage carried by the report, if any.
    pub const fn percent(&self) -> Option<f64> {
        match self {
            Self::Running { percent, .. } | Self::Finished { percent, .. } => Some(*percent),
            Self::Stopped { .. } => None,
        }
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// `H:MM:SS` with unpadded hours. Sub-second precision is truncated.
struct Hms(Duration);

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.as_secs();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        write!(f, "{hours}:{minutes:02}:{seconds:02}")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running {
                world,
                processed,
                percent,
                eta,
                rate,
                current,
            } => write!(
                f,
                "[pregen] Task running for {world}. Processed: {processed} chunks ({percent:.2}%), ETA: {}, Rate: {rate:.1} cps, Current: {current}",
                Hms(*eta)
            ),
            Self::Finished {
                world,
                processed,
                percent,
                elapsed,
            } => write!(
                f,
                "[pregen] Task finished for {world}. Processed: {processed} chunks ({percent:.2}%), Total time: {}",
                Hms(*elapsed)
            ),
            Self::Stopped { world } => write!(f, "[pregen] Task stopped for {world}."),
        }
    }
}

/// Destination for formatted status lines.
///
/// Called once per completed chunk from whichever task observed the
/// completion, so implementations must be cheap and must not block.
pub trait ReportSink: Send + Sync + 'static {
    fn report(&self, report: &Report);
}

impl<F> ReportSink for F
where
    F: Fn(&Report) + Send + Sync + 'static,
{
    fn report(&self, report: &Report) {
        self(report);
    }
}

/// Forwards reports to a channel. Reports are dropped once the receiver is
/// gone.
impl ReportSink for mpsc::UnboundedSender<Report> {
    fn report(&self, report: &Report) {
        let _ = self.send(report.clone());
    }
}

/// Writes every report to standard output, like a server console.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn report(&self, report: &Report) {
        println!("{report}");
    }
}

/// Emits every report as an `info` event under the `pregen::report` target.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

#[cfg(feature = "tracing")]
impl ReportSink for LogSink {
    fn report(&self, report: &Report) {
        tracing::info!(target: "pregen::report", world = report.world(), "{report}");
    }
}
