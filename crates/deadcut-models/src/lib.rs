//! Shared data models for the deadcut pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Analysis samples and summaries (loudness, motion)
//! - Time ranges and processing plans
//! - Encoding configuration
//! - Detection and render settings
//! - Phase-scaled progress mapping

pub mod analysis;
pub mod encoding;
pub mod plan;
pub mod progress;
pub mod range;
pub mod settings;

// Re-export common types
pub use analysis::{AnalysisSummary, Sample, SILENCE_FLOOR_DB};
pub use encoding::EncodingConfig;
pub use plan::{PlanStats, ProcessingPlan, TransformMode};
pub use progress::PhaseScale;
pub use range::TimeRange;
pub use settings::{DetectionSettings, DetectionSource, RenderSettings};
