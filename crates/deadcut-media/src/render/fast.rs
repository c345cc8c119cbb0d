//! Fast path: single-pass filter-graph transcode.
//!
//! Three strictly sequential FFmpeg invocations: a video-only pass over the
//! trim/concat graph, an audio-only pass when the source carries audio, and
//! a lossless mux of the two intermediates into the final output. Each step
//! depends on the previous step's file, so there is no parallelism here.

use std::path::Path;
use std::process::Stdio;

use tracing::{debug, info};

use deadcut_models::{EncodingConfig, PhaseScale};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::graph::FilterGraph;
use crate::progress::ProgressFn;

/// Run the single-pass transcode. Any FFmpeg failure is returned to the
/// caller, which downgrades to the safe path.
pub async fn run_fast_path(
    source: &Path,
    graph: &FilterGraph,
    output: &Path,
    encoding: &EncodingConfig,
    duration_ms: u64,
    progress: ProgressFn,
) -> MediaResult<()> {
    if graph.is_empty() {
        return Err(MediaError::NoSegments);
    }

    let temp_dir = tempfile::tempdir()?;
    let temp_video = temp_dir.path().join("video.mp4");
    let temp_audio = temp_dir.path().join("audio.m4a");

    let runner = FfmpegRunner::new();

    // Video pass
    info!(segments = graph.stream_count(), "Fast path: video pass");
    let video_cmd = FfmpegCommand::new(source, &temp_video)
        .filter_complex(graph.video_filter_complex())
        .map("[outv]")
        .no_audio()
        .output_args(encoding.video_args_for(encoding.primary_encoder()));

    let video_scale = PhaseScale::new(0.0, if graph.has_audio { 70.0 } else { 90.0 });
    let progress_clone = progress.clone();
    runner
        .run_with_progress(&video_cmd, move |p| {
            let out_ms = p.out_time_ms.max(0) as u64;
            progress_clone(
                video_scale.apply(out_ms, duration_ms),
                100,
                "rendering video",
            );
        })
        .await?;

    // Audio pass
    let audio_filter = graph.audio_filter_complex();
    if let Some(filter) = &audio_filter {
        info!("Fast path: audio pass");
        let audio_cmd = FfmpegCommand::new(source, &temp_audio)
            .filter_complex(filter.clone())
            .map("[outa]")
            .no_video()
            .output_args(encoding.audio_args());

        let audio_scale = PhaseScale::new(70.0, 20.0);
        let progress_clone = progress.clone();
        runner
            .run_with_progress(&audio_cmd, move |p| {
                let out_ms = p.out_time_ms.max(0) as u64;
                progress_clone(
                    audio_scale.apply(out_ms, duration_ms),
                    100,
                    "rendering audio",
                );
            })
            .await?;
    }

    // Lossless mux of the intermediates
    info!("Fast path: mux");
    let mut mux = tokio::process::Command::new("ffmpeg");
    mux.args(["-y", "-hide_banner", "-loglevel", "error"])
        .arg("-i")
        .arg(&temp_video);
    if audio_filter.is_some() && temp_audio.exists() {
        mux.arg("-i").arg(&temp_audio);
    }
    mux.args(["-c", "copy"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let result = mux
        .output()
        .await
        .map_err(|e| MediaError::ffmpeg_failed(format!("mux failed to start: {e}"), None, None))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr).to_string();
        return Err(MediaError::ffmpeg_failed(
            "mux failed",
            Some(stderr),
            result.status.code(),
        ));
    }

    progress(100, 100, "rendering complete");
    debug!(output = %output.display(), "Fast path complete");
    Ok(())
}
