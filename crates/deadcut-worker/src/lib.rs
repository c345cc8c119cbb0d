//! Dead-time detection and render worker.
//!
//! Ties the analysis and render stages together: concurrent audio/video
//! analysis, range detection and merging into a processing plan, and the
//! render invocation behind a per-source gate.

pub mod config;
pub mod error;
pub mod gate;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use gate::RenderGate;
pub use pipeline::{analyze_media, build_plan, process_video, MediaAnalysis, PipelineOutcome};
