use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global log subscriber.
///
/// Verbosity comes from `RUST_LOG` and defaults to `info`. Status lines sent
/// through `LogSink` use the `pregen::report` target, so
/// `RUST_LOG=info,pregen::report=off` keeps lifecycle events and silences
/// per-chunk progress.
pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
        )
        .try_init()?;
    Ok(())
}
