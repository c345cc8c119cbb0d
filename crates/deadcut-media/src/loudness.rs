//! Per-chunk loudness analysis of the audio track.
//!
//! The audio track is decoded to mono f32 PCM through FFmpeg, split into
//! fixed-length chunks, and each chunk's loudness is measured in dBFS.
//! Chunks with exactly zero energy (true digital silence) get a fixed floor
//! value so the sequence stays numeric and positionally aligned with time.

use std::path::Path;
use std::process::Stdio;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use deadcut_models::{AnalysisSummary, Sample, SILENCE_FLOOR_DB};

use crate::error::{MediaError, MediaResult};
use crate::progress::ProgressFn;

/// Sample rate the audio track is decoded to for analysis.
const ANALYSIS_SAMPLE_RATE: u64 = 16_000;

/// Progress is reported once per this many chunks.
const PROGRESS_STRIDE: u64 = 20;

/// Analyze the loudness of a file's audio track in fixed-length chunks.
///
/// Returns a summary whose `samples` hold one dBFS value per chunk. When
/// FFmpeg is missing the analysis degrades to a skipped (floor-filled)
/// summary rather than erroring; the same happens when the file has no
/// audio track.
pub async fn analyze_loudness(
    input_path: &Path,
    chunk_ms: u64,
    progress: ProgressFn,
) -> MediaResult<AnalysisSummary> {
    if which::which("ffmpeg").is_err() {
        warn!("FFmpeg not found, skipping loudness analysis");
        return Ok(AnalysisSummary::skipped(SILENCE_FLOOR_DB));
    }

    let temp_audio = NamedTempFile::new()?;
    if let Err(e) = extract_audio_pcm(input_path, temp_audio.path()).await {
        // A file without an audio track is not an error; the motion-only
        // plan is still valid.
        warn!(error = %e, "Audio extraction failed, skipping loudness analysis");
        return Ok(AnalysisSummary::skipped(SILENCE_FLOOR_DB));
    }

    let samples = load_pcm_samples(temp_audio.path()).await?;
    if samples.is_empty() {
        warn!("No audio data decoded, skipping loudness analysis");
        return Ok(AnalysisSummary::skipped(SILENCE_FLOOR_DB));
    }

    debug!(
        samples = samples.len(),
        chunk_ms, "Loaded audio samples for loudness analysis"
    );

    Ok(chunk_loudness(&samples, chunk_ms, &progress))
}

/// Split decoded samples into chunks and measure each chunk's dBFS.
fn chunk_loudness(samples: &[f32], chunk_ms: u64, progress: &ProgressFn) -> AnalysisSummary {
    let chunk_len = ((chunk_ms * ANALYSIS_SAMPLE_RATE) / 1000).max(1) as usize;
    let chunk_count = samples.len().div_ceil(chunk_len) as u64;

    let mut loudness = Vec::with_capacity(chunk_count as usize);
    for (i, chunk) in samples.chunks(chunk_len).enumerate() {
        loudness.push(Sample::new(i as u64, chunk_dbfs(chunk)));

        if i as u64 % PROGRESS_STRIDE == 0 {
            progress(i as u64, chunk_count, "analyzing audio");
        }
    }
    progress(chunk_count, chunk_count, "analyzing audio");

    AnalysisSummary::over_floor(loudness, SILENCE_FLOOR_DB)
}

/// Loudness of one chunk in dBFS; exactly zero energy maps to the floor.
fn chunk_dbfs(chunk: &[f32]) -> f64 {
    if chunk.is_empty() {
        return SILENCE_FLOOR_DB;
    }

    let sum_squares: f64 = chunk.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    let rms = (sum_squares / chunk.len() as f64).sqrt();

    if rms == 0.0 {
        SILENCE_FLOOR_DB
    } else {
        20.0 * rms.log10()
    }
}

/// Decode the audio track to 16kHz mono raw f32 PCM.
async fn extract_audio_pcm(input: &Path, output: &Path) -> MediaResult<()> {
    debug!(
        input = %input.display(),
        output = %output.display(),
        "Extracting audio for loudness analysis"
    );

    let status = tokio::process::Command::new("ffmpeg")
        .args([
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            input.to_str().unwrap_or_default(),
            "-vn",
            "-ar",
            &ANALYSIS_SAMPLE_RATE.to_string(),
            "-ac",
            "1",
            "-f",
            "f32le",
            output.to_str().unwrap_or_default(),
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| MediaError::ffmpeg_failed(e.to_string(), None, None))?;

    if !status.success() {
        return Err(MediaError::ffmpeg_failed(
            "audio extraction failed",
            None,
            status.code(),
        ));
    }

    let metadata = tokio::fs::metadata(output).await?;
    if metadata.len() == 0 {
        return Err(MediaError::InvalidVideo("no audio data".to_string()));
    }

    Ok(())
}

/// Load raw f32le samples from a file.
async fn load_pcm_samples(path: &Path) -> MediaResult<Vec<f32>> {
    let bytes = tokio::fs::read(path).await?;

    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::noop_progress;

    #[test]
    fn test_chunk_dbfs_silence_floor() {
        assert_eq!(chunk_dbfs(&[0.0; 128]), SILENCE_FLOOR_DB);
        assert_eq!(chunk_dbfs(&[]), SILENCE_FLOOR_DB);
    }

    #[test]
    fn test_chunk_dbfs_full_scale() {
        // A full-scale square wave has RMS 1.0 = 0 dBFS
        let full: Vec<f32> = vec![1.0; 256];
        assert!(chunk_dbfs(&full).abs() < 0.001);

        // Half amplitude is about -6 dBFS
        let half: Vec<f32> = vec![0.5; 256];
        assert!((chunk_dbfs(&half) - (-6.02)).abs() < 0.1);
    }

    #[test]
    fn test_chunk_loudness_alignment() {
        // 100ms chunks at 16kHz = 1600 samples per chunk; 3.5 chunks of data
        let mut samples = vec![0.5f32; 1600];
        samples.extend(vec![0.0f32; 1600]);
        samples.extend(vec![0.25f32; 1600]);
        samples.extend(vec![0.5f32; 800]);

        let summary = chunk_loudness(&samples, 100, &noop_progress());
        assert_eq!(summary.len(), 4);
        // Zero-energy chunk is floor-filled but present
        assert_eq!(summary.samples[1].value, SILENCE_FLOOR_DB);
        // Stats skip the floor entry
        assert!(summary.min > SILENCE_FLOOR_DB);
    }

    #[test]
    fn test_chunk_loudness_all_silent() {
        let samples = vec![0.0f32; 4800];
        let summary = chunk_loudness(&samples, 100, &noop_progress());
        assert_eq!(summary.min, SILENCE_FLOOR_DB);
        assert_eq!(summary.max, SILENCE_FLOOR_DB);
        assert_eq!(summary.mean, SILENCE_FLOOR_DB);
        assert_eq!(summary.len(), 3);
    }

    #[tokio::test]
    async fn test_load_pcm_samples() {
        let temp = NamedTempFile::new().unwrap();
        let test_samples: Vec<f32> = vec![0.0, 0.5, 1.0, -1.0];
        let bytes: Vec<u8> = test_samples.iter().flat_map(|f| f.to_le_bytes()).collect();
        tokio::fs::write(temp.path(), &bytes).await.unwrap();

        let loaded = load_pcm_samples(temp.path()).await.unwrap();
        assert_eq!(loaded.len(), 4);
        assert!((loaded[1] - 0.5).abs() < 0.001);
        assert!((loaded[3] - (-1.0)).abs() < 0.001);
    }
}
