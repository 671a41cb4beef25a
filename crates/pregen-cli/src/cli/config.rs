use anyhow::bail;
use clap::{Parser, ValueEnum};
use pregen::{
    ChunkPos, DEFAULT_CONCURRENCY, DEFAULT_DRAIN_INTERVAL, DEFAULT_POLL_INTERVAL,
    DEFAULT_RATE_WINDOW, Region, TaskConfig,
};
use std::{path::PathBuf, time::Duration};

/// Where per-chunk status lines are written.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    /// Plain lines on standard output.
    Console,
    /// `info` events through the log subscriber.
    Log,
}

/// Runtime configuration for the `pregen` binary.
///
/// Every value can be passed as a flag or through the environment (a `.env`
/// file in the working directory is loaded first). Defaults match the
/// library's [`TaskConfig::default`].
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pregen",
    version,
    about = "Pre-generate every chunk in a square region, throttled and resumable"
)]
pub struct CliArgs {
    /// World whose chunks are generated. At most one task runs per world.
    ///
    /// Environment variable: `PREGEN_WORLD`
    #[arg(long, env = "PREGEN_WORLD", default_value_t = String::from("world"))]
    pub world: String,

    /// Chunk X coordinate of the region center.
    ///
    /// Environment variable: `PREGEN_CENTER_X`
    #[arg(long, env = "PREGEN_CENTER_X", default_value_t = 0, allow_negative_numbers = true)]
    pub center_x: i32,

    /// Chunk Z coordinate of the region center.
    ///
    /// Environment variable: `PREGEN_CENTER_Z`
    #[arg(long, env = "PREGEN_CENTER_Z", default_value_t = 0, allow_negative_numbers = true)]
    pub center_z: i32,

    /// Radius of the region in chunks. The region spans `2 * radius + 1`
    /// chunks on each side; a negative radius selects nothing.
    ///
    /// Environment variable: `PREGEN_RADIUS`
    #[arg(long, env = "PREGEN_RADIUS", default_value_t = 32, allow_negative_numbers = true)]
    pub radius: i32,

    /// Maximum number of generation requests in flight.
    ///
    /// Environment variable: `PREGEN_CONCURRENCY`
    #[arg(long, env = "PREGEN_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Sleep between checks for a free slot while at the concurrency cap, in
    /// milliseconds.
    ///
    /// Environment variable: `PREGEN_POLL_INTERVAL_MS`
    #[arg(long, env = "PREGEN_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Sleep between checks while waiting for in-flight requests to land, in
    /// milliseconds.
    ///
    /// Environment variable: `PREGEN_DRAIN_INTERVAL_MS`
    #[arg(long, env = "PREGEN_DRAIN_INTERVAL_MS", default_value_t = DEFAULT_DRAIN_INTERVAL.as_millis() as u64)]
    pub drain_interval_ms: u64,

    /// Horizon of the throughput window, in seconds.
    ///
    /// Environment variable: `PREGEN_RATE_WINDOW_SECS`
    #[arg(long, env = "PREGEN_RATE_WINDOW_SECS", default_value_t = DEFAULT_RATE_WINDOW.as_secs())]
    pub rate_window_secs: u64,

    /// Abandon a request that has not resolved after this many milliseconds.
    /// Unset waits forever.
    ///
    /// Environment variable: `PREGEN_GENERATION_TIMEOUT_MS`
    #[arg(long, env = "PREGEN_GENERATION_TIMEOUT_MS")]
    pub generation_timeout_ms: Option<u64>,

    /// JSON file holding stopped tasks.
    ///
    /// Environment variable: `PREGEN_STORE_PATH`
    #[arg(long, env = "PREGEN_STORE_PATH", default_value = "pregen-tasks.json")]
    pub store_path: PathBuf,

    /// Continue the task saved for `--world` instead of starting a new one.
    /// The saved region takes precedence over `--center-*` and `--radius`.
    #[arg(short, long, default_value_t = false)]
    pub resume: bool,

    /// Destination of per-chunk status lines.
    ///
    /// Environment variable: `PREGEN_REPORT`
    #[arg(long, env = "PREGEN_REPORT", value_enum, default_value_t = ReportTarget::Console)]
    pub report: ReportTarget,

    /// Lower bound of the simulated generation latency, in milliseconds.
    ///
    /// Environment variable: `PREGEN_MIN_LATENCY_MS`
    #[arg(long, env = "PREGEN_MIN_LATENCY_MS", default_value_t = 5)]
    pub min_latency_ms: u64,

    /// Upper bound of the simulated generation latency, in milliseconds.
    ///
    /// Environment variable: `PREGEN_MAX_LATENCY_MS`
    #[arg(long, env = "PREGEN_MAX_LATENCY_MS", default_value_t = 50)]
    pub max_latency_ms: u64,

    /// Fraction of the region that already exists before the task starts,
    /// between 0 and 1.
    ///
    /// Environment variable: `PREGEN_PREGENERATED`
    #[arg(long, env = "PREGEN_PREGENERATED", default_value_t = 0.25)]
    pub pregenerated: f64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub world: String,
    pub region: Region,
    pub task: TaskConfig,
    pub store_path: PathBuf,
    pub resume: bool,
    pub report: ReportTarget,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub pregenerated: f64,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.world.trim().is_empty() {
            bail!("PREGEN_WORLD must not be empty");
        }

        if args.min_latency_ms > args.max_latency_ms {
            bail!(
                "PREGEN_MIN_LATENCY_MS ({}) exceeds PREGEN_MAX_LATENCY_MS ({})",
                args.min_latency_ms,
                args.max_latency_ms
            );
        }

        if !(0.0..=1.0).contains(&args.pregenerated) {
            bail!(
                "PREGEN_PREGENERATED must be between 0 and 1, got {}",
                args.pregenerated
            );
        }

        let task = TaskConfig::default()
            .with_concurrency(args.concurrency)
            .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
            .with_drain_interval(Duration::from_millis(args.drain_interval_ms))
            .with_rate_window(Duration::from_secs(args.rate_window_secs))
            .with_generation_timeout(args.generation_timeout_ms.map(Duration::from_millis));
        task.validate()?;

        let region = Region::new(ChunkPos::new(args.center_x, args.center_z), args.radius);
        region.validate()?;

        Ok(Self {
            world: args.world,
            region,
            task,
            store_path: args.store_path,
            resume: args.resume,
            report: args.report,
            min_latency: Duration::from_millis(args.min_latency_ms),
            max_latency: Duration::from_millis(args.max_latency_ms),
            pregenerated: args.pregenerated,
        })
    }
}
