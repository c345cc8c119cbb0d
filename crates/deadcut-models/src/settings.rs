//! Detection and render tunables.
//!
//! These parameters control how aggressively dead time is detected and how
//! the rewrite is rendered. Defaults match the original desktop tool's
//! shipped configuration.

use serde::{Deserialize, Serialize};

/// Which signal sources contribute candidate ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// Audio silence only.
    Audio,
    /// Video stillness only.
    Video,
    /// Both, combined by a second merge pass.
    Both,
}

/// Tunables for the analysis and detection stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Audio chunk length in milliseconds. Smaller chunks resolve shorter
    /// pauses at the cost of more samples.
    pub audio_chunk_ms: u64,

    /// Loudness below this dBFS value counts as silence.
    pub silence_threshold_db: f64,

    /// Motion magnitude below this value counts as static.
    pub motion_threshold: f64,

    /// Fraction of frame width/height trimmed from each edge before motion
    /// comparison, so tickers and overlays at the borders don't register.
    pub video_crop_ratio: f64,

    /// Resolution scale applied before frame comparison. Smaller is faster;
    /// magnitudes are normalized per pixel so the units don't change.
    pub video_analysis_scale: f64,

    /// Minimum silence duration kept after merging (milliseconds).
    pub min_silence_duration_ms: u64,

    /// Minimum static duration kept after merging (milliseconds).
    pub min_static_duration_ms: u64,

    /// Gap tolerance when merging candidate ranges (milliseconds).
    pub merge_gap_ms: u64,

    /// Which sources feed the plan.
    pub source: DetectionSource,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            audio_chunk_ms: 100,
            silence_threshold_db: -40.0,
            motion_threshold: 2.0,
            video_crop_ratio: 0.25,
            video_analysis_scale: 0.25,
            min_silence_duration_ms: 500,
            min_static_duration_ms: 500,
            merge_gap_ms: 100,
            source: DetectionSource::Both,
        }
    }
}

impl DetectionSettings {
    /// Builder-style setter for the silence threshold.
    pub fn with_silence_threshold(mut self, db: f64) -> Self {
        self.silence_threshold_db = db;
        self
    }

    /// Builder-style setter for the motion threshold.
    pub fn with_motion_threshold(mut self, threshold: f64) -> Self {
        self.motion_threshold = threshold;
        self
    }

    /// Builder-style setter for the detection source.
    pub fn with_source(mut self, source: DetectionSource) -> Self {
        self.source = source;
        self
    }
}

/// Tunables for the render stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Margin kept before each planned range, in seconds. The cut (or
    /// speed-up) starts this far before the detected range.
    pub pre_margin_secs: f64,

    /// Margin kept after each planned range, in seconds.
    pub post_margin_secs: f64,

    /// Playback speed multiplier for speed-up mode.
    pub speedup_factor: f64,

    /// Audio volume during sped-up ranges, in percent of the original.
    pub speedup_volume_percent: u32,

    /// Hard cap on concatenated streams the single-pass executor accepts.
    /// Above this the segment-render fallback is forced. Calibrate against
    /// the ffmpeg build in use; allocation failures appear past the real
    /// limit.
    pub max_concat_streams: usize,

    /// Whether to try the single-pass fast path first at all.
    pub use_fast_path: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            pre_margin_secs: 2.0,
            post_margin_secs: 1.0,
            speedup_factor: 5.0,
            speedup_volume_percent: 50,
            max_concat_streams: 50,
            use_fast_path: true,
        }
    }
}

impl RenderSettings {
    /// Pre margin in milliseconds.
    pub fn pre_margin_ms(&self) -> u64 {
        (self.pre_margin_secs * 1000.0).round() as u64
    }

    /// Post margin in milliseconds.
    pub fn post_margin_ms(&self) -> u64 {
        (self.post_margin_secs * 1000.0).round() as u64
    }

    /// Speed-up audio volume as a 0.0-1.0 scale.
    pub fn speedup_volume(&self) -> f64 {
        self.speedup_volume_percent as f64 / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_conversion() {
        let settings = RenderSettings::default();
        assert_eq!(settings.pre_margin_ms(), 2000);
        assert_eq!(settings.post_margin_ms(), 1000);
        assert!((settings.speedup_volume() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detection_builder() {
        let settings = DetectionSettings::default()
            .with_silence_threshold(-35.0)
            .with_source(DetectionSource::Audio);
        assert!((settings.silence_threshold_db - (-35.0)).abs() < f64::EPSILON);
        assert_eq!(settings.source, DetectionSource::Audio);
    }
}
