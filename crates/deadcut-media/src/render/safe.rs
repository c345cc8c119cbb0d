//! Safe path: segment-by-segment render and join.
//!
//! Each graph segment is materialized as an independent clip file (the
//! speed/volume transform applied per segment), the clips are joined with
//! the concat demuxer, and the joined stream is encoded once, trying
//! encoders from the priority list in order. Structurally this handles any
//! segment count; it is bounded by time and disk, not by a stream ceiling.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info, warn};

use deadcut_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::graph::{atempo_chain, FilterGraph, FilterSegment};
use crate::progress::ProgressFn;

/// Intermediate clips are encoded with a fixed software encoder so the
/// priority list only governs the final encode.
const SEGMENT_ENCODER_ARGS: [&str; 6] = ["-c:v", "libx264", "-preset", "veryfast", "-crf", "20"];

/// Run the segment-render-and-join fallback.
pub async fn run_safe_path(
    source: &Path,
    graph: &FilterGraph,
    output: &Path,
    encoding: &EncodingConfig,
    progress: ProgressFn,
) -> MediaResult<()> {
    if graph.is_empty() {
        return Err(MediaError::NoSegments);
    }

    let temp_dir = tempfile::tempdir()?;
    let total = graph.stream_count() as u64;
    let mut clip_paths = Vec::with_capacity(graph.stream_count());

    info!(segments = total, "Safe path: materializing segments");

    for (i, segment) in graph.segments.iter().enumerate() {
        let clip_path = temp_dir.path().join(format!("seg_{i:04}.mp4"));
        extract_segment(source, segment, &clip_path, graph.has_audio).await?;
        clip_paths.push(clip_path);
        progress(i as u64 + 1, total + 1, "rendering segments");
    }

    // Concat list for the demuxer
    let concat_list = temp_dir.path().join("concat.txt");
    tokio::fs::write(&concat_list, concat_list_content(&clip_paths)).await?;

    encode_concat(&concat_list, output, encoding, graph.has_audio).await?;

    progress(total + 1, total + 1, "rendering complete");
    info!(output = %output.display(), "Safe path complete");
    Ok(())
}

/// Materialize one segment as an independent clip, applying its transform.
async fn extract_segment(
    source: &Path,
    segment: &FilterSegment,
    clip_path: &Path,
    has_audio: bool,
) -> MediaResult<()> {
    let start_sec = segment.start_ms() as f64 / 1000.0;
    let duration_sec = segment.duration_ms() as f64 / 1000.0;

    // Two-pass seeking: fast input seek near the target, accurate output
    // seek from there. Input-only seeking lands on keyframes and duplicates
    // frames at the joins.
    let fast_seek = if start_sec > 5.0 { start_sec - 5.0 } else { 0.0 };
    let accurate_seek = start_sec - fast_seek;

    let mut cmd = tokio::process::Command::new("ffmpeg");
    cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
        .args(["-ss", &format!("{fast_seek:.3}")])
        .arg("-i")
        .arg(source)
        .args(["-ss", &format!("{accurate_seek:.3}")])
        .args(["-t", &format!("{duration_sec:.3}")]);

    if let FilterSegment::Transform { factor, volume, .. } = segment {
        cmd.args(["-vf", &format!("setpts=PTS/{factor}")]);
        if has_audio {
            let mut af = String::new();
            for stage in atempo_chain(*factor) {
                af.push_str(&format!("atempo={stage:.4},"));
            }
            af.push_str(&format!("volume={volume:.4}"));
            cmd.args(["-af", &af]);
        }
    }

    cmd.args(SEGMENT_ENCODER_ARGS);
    if has_audio {
        cmd.args(["-c:a", "aac", "-b:a", "128k"]);
    } else {
        cmd.arg("-an");
    }
    cmd.args(["-avoid_negative_ts", "make_zero"])
        .arg(clip_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    debug!(
        start_sec,
        duration_sec,
        clip = %clip_path.display(),
        "Extracting segment"
    );

    let result = cmd.output().await.map_err(|e| {
        MediaError::ffmpeg_failed(format!("segment extraction failed to start: {e}"), None, None)
    })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(MediaError::ffmpeg_failed(
            "segment extraction failed",
            Some(stderr.lines().last().unwrap_or("unknown error").to_string()),
            result.status.code(),
        ));
    }

    Ok(())
}

/// Join the clips and encode the result, walking the encoder priority list.
async fn encode_concat(
    concat_list: &Path,
    output: &Path,
    encoding: &EncodingConfig,
    has_audio: bool,
) -> MediaResult<()> {
    let mut failures = Vec::new();

    for codec in &encoding.encoder_priority {
        let mut cmd = tokio::process::Command::new("ffmpeg");
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "concat", "-safe", "0"])
            .arg("-i")
            .arg(concat_list)
            .args(encoding.video_args_for(codec));
        if has_audio {
            cmd.args(encoding.audio_args());
        } else {
            cmd.arg("-an");
        }
        cmd.args(["-movflags", "+faststart"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        info!(codec = %codec, "Safe path: final encode");

        match cmd.output().await {
            Ok(result) if result.status.success() => return Ok(()),
            Ok(result) => {
                let stderr = String::from_utf8_lossy(&result.stderr);
                let last = stderr.lines().last().unwrap_or("unknown error");
                warn!(codec = %codec, error = %last, "Encoder failed, trying next");
                failures.push(format!("{codec}: {last}"));
                // A partial output from the failed attempt must not survive
                let _ = tokio::fs::remove_file(output).await;
            }
            Err(e) => {
                warn!(codec = %codec, error = %e, "Encoder failed to start, trying next");
                failures.push(format!("{codec}: {e}"));
            }
        }
    }

    Err(MediaError::AllEncodersFailed(failures.join("; ")))
}

/// Concat-demuxer list file content for the clip paths.
fn concat_list_content(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display()))
        .collect()
}
