//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

use deadcut_media::MediaError;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors from the worker pipeline.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("A render job is already running for {0}")]
    RenderBusy(PathBuf),

    #[error("Analysis task panicked: {0}")]
    AnalysisPanicked(String),
}
