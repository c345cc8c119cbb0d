//! Worker configuration from environment variables.

use deadcut_models::{
    DetectionSettings, DetectionSource, EncodingConfig, RenderSettings, TransformMode,
};

/// Worker configuration.
///
/// Detection, render, and encoding tunables are read from `DEADCUT_*`
/// environment variables, falling back to the model defaults.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// What to do with detected ranges.
    pub mode: TransformMode,
    /// Detection tunables.
    pub detection: DetectionSettings,
    /// Render tunables.
    pub render: RenderSettings,
    /// Encoder configuration.
    pub encoding: EncodingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            mode: TransformMode::Remove,
            detection: DetectionSettings::default(),
            render: RenderSettings::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mode = match std::env::var("DEADCUT_MODE").as_deref() {
            Ok("speedup") => TransformMode::SpeedUp,
            Ok("remove") => TransformMode::Remove,
            _ => defaults.mode,
        };

        let source = match std::env::var("DEADCUT_SOURCE").as_deref() {
            Ok("audio") => DetectionSource::Audio,
            Ok("video") => DetectionSource::Video,
            Ok("both") => DetectionSource::Both,
            _ => defaults.detection.source,
        };

        let detection = DetectionSettings {
            audio_chunk_ms: env_parse("DEADCUT_AUDIO_CHUNK_MS", defaults.detection.audio_chunk_ms),
            silence_threshold_db: env_parse(
                "DEADCUT_SILENCE_DB",
                defaults.detection.silence_threshold_db,
            ),
            motion_threshold: env_parse(
                "DEADCUT_MOTION_THRESHOLD",
                defaults.detection.motion_threshold,
            ),
            video_crop_ratio: env_parse(
                "DEADCUT_VIDEO_CROP_RATIO",
                defaults.detection.video_crop_ratio,
            ),
            video_analysis_scale: env_parse(
                "DEADCUT_VIDEO_ANALYSIS_SCALE",
                defaults.detection.video_analysis_scale,
            ),
            min_silence_duration_ms: env_parse(
                "DEADCUT_MIN_SILENCE_MS",
                defaults.detection.min_silence_duration_ms,
            ),
            min_static_duration_ms: env_parse(
                "DEADCUT_MIN_STATIC_MS",
                defaults.detection.min_static_duration_ms,
            ),
            merge_gap_ms: env_parse("DEADCUT_MERGE_GAP_MS", defaults.detection.merge_gap_ms),
            source,
        };

        let render = RenderSettings {
            pre_margin_secs: env_parse("DEADCUT_PRE_MARGIN_SECS", defaults.render.pre_margin_secs),
            post_margin_secs: env_parse(
                "DEADCUT_POST_MARGIN_SECS",
                defaults.render.post_margin_secs,
            ),
            speedup_factor: env_parse("DEADCUT_SPEEDUP_FACTOR", defaults.render.speedup_factor),
            speedup_volume_percent: env_parse(
                "DEADCUT_SPEEDUP_VOLUME_PERCENT",
                defaults.render.speedup_volume_percent,
            ),
            max_concat_streams: env_parse(
                "DEADCUT_MAX_CONCAT_STREAMS",
                defaults.render.max_concat_streams,
            ),
            use_fast_path: env_parse("DEADCUT_USE_FAST_PATH", defaults.render.use_fast_path),
        };

        let encoding = EncodingConfig {
            encoder_priority: std::env::var("DEADCUT_ENCODER_PRIORITY")
                .map(|s| s.split(',').map(|c| c.trim().to_string()).collect())
                .unwrap_or(defaults.encoding.encoder_priority),
            cpu_threads: env_parse("DEADCUT_CPU_THREADS", defaults.encoding.cpu_threads),
            ..defaults.encoding
        };

        Self {
            mode,
            detection,
            render,
            encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.mode, TransformMode::Remove);
        assert_eq!(config.detection.source, DetectionSource::Both);
        assert_eq!(config.render.max_concat_streams, 50);
    }

    #[test]
    fn test_env_parse_fallback() {
        assert_eq!(env_parse("DEADCUT_TEST_UNSET_KEY", 42u64), 42);
    }
}
