//! Video encoding configuration.

use serde::{Deserialize, Serialize};

/// Default encoding preset.
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor).
pub const DEFAULT_CRF: u8 = 20;
/// Default audio codec.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate.
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Video encoding configuration.
///
/// `encoder_priority` is tried in order by the safe render path; the fast
/// path uses the first entry. Hardware encoders go first so machines with
/// NVENC get the fast exit, with `libx264` as the universal fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video encoders in preference order (e.g. "h264_nvenc", "libx264").
    #[serde(default = "default_encoder_priority")]
    pub encoder_priority: Vec<String>,

    /// Encoding preset (e.g. "fast", "medium", "slow").
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better).
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Thread count for software (libx264) encoding.
    #[serde(default = "default_cpu_threads")]
    pub cpu_threads: u32,
}

fn default_encoder_priority() -> Vec<String> {
    vec![
        "h264_nvenc".to_string(),
        "h264_videotoolbox".to_string(),
        "libx264".to_string(),
    ]
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_cpu_threads() -> u32 {
    4
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            encoder_priority: default_encoder_priority(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            cpu_threads: default_cpu_threads(),
        }
    }
}

impl EncodingConfig {
    /// The encoder the fast path uses.
    pub fn primary_encoder(&self) -> &str {
        self.encoder_priority
            .first()
            .map(String::as_str)
            .unwrap_or("libx264")
    }

    /// Whether a codec name is a software encoder that honors `-threads`.
    pub fn is_software_encoder(codec: &str) -> bool {
        codec == "libx264" || codec == "libx265"
    }

    /// Video-encode arguments for a given codec from the priority list.
    pub fn video_args_for(&self, codec: &str) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            codec.to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
        ];
        if Self::is_software_encoder(codec) {
            args.push("-threads".to_string());
            args.push(self.cpu_threads.to_string());
        }
        args
    }

    /// Audio-encode arguments.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }
}
