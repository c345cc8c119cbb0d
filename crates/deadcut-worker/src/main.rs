//! Dead-time removal worker binary.
//!
//! Usage: `deadcut-worker <video> [<video> ...]`
//!
//! Detection and render tunables come from `DEADCUT_*` environment
//! variables (see `WorkerConfig`); sources are processed one at a time so
//! only a single render job ever runs.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deadcut_media::ProgressFn;
use deadcut_worker::{process_video, PipelineOutcome, RenderGate, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON opt-in
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("deadcut=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let sources: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if sources.is_empty() {
        anyhow::bail!("usage: deadcut-worker <video> [<video> ...]");
    }

    info!("Starting deadcut-worker");

    let config = WorkerConfig::from_env();
    debug!(?config, "Worker config");

    let gate = RenderGate::new();
    let progress: ProgressFn = Arc::new(|value, max, label| {
        debug!(value, max, label, "progress");
    });

    let mut failed = false;
    for source in &sources {
        info!(source = %source.display(), "Processing");
        match process_video(source, &config, &gate, progress.clone()).await {
            Ok(PipelineOutcome::Rendered { output, backend }) => {
                info!(
                    source = %source.display(),
                    output = %output.display(),
                    ?backend,
                    "Done"
                );
                println!("{}", output.display());
            }
            Ok(PipelineOutcome::NothingToDo) => {
                info!(source = %source.display(), "Nothing to do");
            }
            Err(e) => {
                error!(source = %source.display(), error = %e, "Processing failed");
                failed = true;
            }
        }
    }

    if failed {
        anyhow::bail!("one or more sources failed");
    }
    Ok(())
}
