#![doc = include_str!("../README.md")]

mod cli;

use anyhow::bail;
use clap::Parser;
use cli::config::{CliArgs, ReportTarget, RunConfig};
use cli::simulated::SimulatedSource;
use cli::telemetry::init_telemetry;
use pregen::{
    ConsoleSink, GenerationTask, JsonFileStore, LogSink, Outcome, ReportSink, RunContext,
    TaskRegistry, TaskStore,
};
use std::sync::Arc;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;

    let store = Arc::new(JsonFileStore::new(&config.store_path));
    let task = Arc::new(build_task(&config, store.as_ref())?);
    log_startup_info(&task, &config);

    let source = Arc::new(SimulatedSource::new(config.min_latency, config.max_latency));
    let seeded = source.seed(task.world(), *task.region(), config.pregenerated);
    tracing::debug!(
        seeded,
        generated = source.generated(task.world()),
        "Seeded simulated world"
    );

    let sink: Arc<dyn ReportSink> = match config.report {
        ReportTarget::Console => Arc::new(ConsoleSink),
        ReportTarget::Log => Arc::new(LogSink),
    };

    let registry = TaskRegistry::new();
    let handle = registry.start(Arc::clone(&task), RunContext::new(source, sink, store))?;
    let shutdown = tokio::spawn(shutdown_signal(registry.clone()));

    match handle.await? {
        Outcome::Completed {
            processed,
            timed_out,
        } => {
            tracing::info!(processed, timed_out, "Pre-generation complete");
        }
        Outcome::Stopped { processed } => {
            tracing::info!(
                processed,
                store = %config.store_path.display(),
                "Pre-generation stopped, run again with --resume to continue"
            );
        }
    }

    shutdown.abort();
    Ok(())
}

/// Builds the task to run: the saved one when resuming, a fresh one
/// otherwise.
fn build_task(config: &RunConfig, store: &dyn TaskStore) -> anyhow::Result<GenerationTask> {
    let saved = store.load(&config.world)?;

    if config.resume {
        let Some(saved) = saved else {
            bail!(
                "No saved task for world {} in {}",
                config.world,
                config.store_path.display()
            );
        };
        if saved.region() != config.region {
            tracing::info!(
                center = %saved.center,
                radius = saved.radius,
                "Resuming with the saved region"
            );
        }
        return Ok(GenerationTask::from_saved(&saved, config.task.clone())?);
    }

    if let Some(saved) = saved {
        tracing::warn!(
            cursor = saved.cursor.index,
            "A stopped task exists for world {}; pass --resume to continue it. Starting over",
            config.world
        );
    }
    Ok(GenerationTask::new(
        config.world.as_str(),
        config.region,
        config.task.clone(),
    ))
}

fn log_startup_info(task: &GenerationTask, config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting pre-generation of {} at {} (cursor {}) with full config: {:#?}",
            task.world(),
            task.center(),
            task.cursor().index,
            config
        );
    } else {
        tracing::info!(
            "Starting pre-generation of {} at {}, radius {}, {} chunks, {} in flight",
            task.world(),
            task.center(),
            task.radius(),
            task.region().cardinality(),
            config.task.concurrency
        );
    }
}

/// Cancels every running task on Ctrl+C or SIGTERM. Tasks drain their
/// in-flight requests and save themselves before `main` returns.
async fn shutdown_signal(registry: TaskRegistry) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    let cancelled = registry.cancel_all();
    tracing::info!(cancelled, "Shutdown signal received, stopping tasks...");
}
