//! The full detect→merge→render pipeline.
//!
//! Loudness and motion analysis run concurrently as two independent
//! read-only decode sessions against the same source; nothing is shared
//! between them, and both must finish before detection and merging proceed.
//! Rendering then runs behind the per-source gate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use deadcut_media::render::{render, RenderBackend, RenderOutcome, RenderRequest};
use deadcut_media::{
    analyze_loudness, analyze_motion, combine_sources, detect_silence, detect_static,
    merge_ranges, probe_video, MediaError, ProgressFn, VideoInfo,
};
use deadcut_models::{
    AnalysisSummary, DetectionSource, PhaseScale, ProcessingPlan, SILENCE_FLOOR_DB,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::gate::RenderGate;

/// Both analyzers' output for one source.
#[derive(Debug, Clone)]
pub struct MediaAnalysis {
    pub info: VideoInfo,
    pub audio: AnalysisSummary,
    pub video: AnalysisSummary,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// No qualifying ranges after merging; no output produced.
    NothingToDo,
    /// Output written.
    Rendered {
        output: PathBuf,
        backend: RenderBackend,
    },
}

/// Wrap a progress callback so phase-local values land in a sub-range of
/// the overall 0-100 scale.
fn scaled(progress: &ProgressFn, scale: PhaseScale) -> ProgressFn {
    let progress = progress.clone();
    Arc::new(move |value, max, label| progress(scale.apply(value, max), 100, label))
}

/// Run loudness and motion analysis concurrently against one source.
///
/// Analysis errors abort the pipeline before any rendering is attempted;
/// a missing or silent audio track is not an error (the loudness analyzer
/// returns a floor summary and the motion-only plan stays valid).
pub async fn analyze_media(
    source: &Path,
    config: &WorkerConfig,
    progress: ProgressFn,
) -> WorkerResult<MediaAnalysis> {
    let info = probe_video(source).await?;
    info!(
        duration_secs = info.duration,
        fps = info.fps,
        has_audio = info.has_audio,
        "Probed source"
    );

    let wants_audio = matches!(
        config.detection.source,
        DetectionSource::Audio | DetectionSource::Both
    );
    let wants_video = matches!(
        config.detection.source,
        DetectionSource::Video | DetectionSource::Both
    );

    let audio_task = {
        let source = source.to_path_buf();
        let chunk_ms = config.detection.audio_chunk_ms;
        let progress = scaled(&progress, PhaseScale::new(0.0, 50.0));
        tokio::spawn(async move {
            if wants_audio {
                analyze_loudness(&source, chunk_ms, progress).await
            } else {
                Ok(AnalysisSummary::skipped(SILENCE_FLOOR_DB))
            }
        })
    };

    let video_task = {
        let source = source.to_path_buf();
        let info = info.clone();
        let crop_ratio = config.detection.video_crop_ratio;
        let scale = config.detection.video_analysis_scale;
        let progress = scaled(&progress, PhaseScale::new(50.0, 50.0));
        tokio::spawn(async move {
            if wants_video {
                analyze_motion(&source, &info, crop_ratio, scale, progress).await
            } else {
                Ok(AnalysisSummary::over_all(Vec::new()))
            }
        })
    };

    let (audio, video) = tokio::join!(audio_task, video_task);
    let audio = audio.map_err(|e| WorkerError::AnalysisPanicked(e.to_string()))??;
    let video = video.map_err(|e| WorkerError::AnalysisPanicked(e.to_string()))??;

    progress(100, 100, "analysis complete");
    info!(
        audio_samples = audio.len(),
        audio_mean_db = audio.mean,
        video_samples = video.len(),
        video_mean_motion = video.mean,
        "Analysis complete"
    );

    Ok(MediaAnalysis { info, audio, video })
}

/// Threshold both sample sequences and merge the candidates into a plan.
///
/// Each source's candidates are merged with that source's own minimum
/// duration first; with both sources active the merged lists then go
/// through one more pass with a small fixed gap so the independently tuned
/// minimums are respected.
pub fn build_plan(analysis: &MediaAnalysis, config: &WorkerConfig) -> ProcessingPlan {
    let detection = &config.detection;
    let total_ms = analysis.info.duration_ms();

    let silence = if !analysis.audio.is_empty() {
        detect_silence(
            &analysis.audio.samples,
            detection.silence_threshold_db,
            detection.audio_chunk_ms,
            total_ms,
        )
    } else {
        Vec::new()
    };

    let stillness = detect_static(
        &analysis.video.samples,
        detection.motion_threshold,
        analysis.info.fps,
        analysis.info.frame_count(),
    );

    info!(
        silence_candidates = silence.len(),
        static_candidates = stillness.len(),
        "Detection complete"
    );

    let ranges = match detection.source {
        DetectionSource::Audio => merge_ranges(
            &silence,
            detection.min_silence_duration_ms,
            detection.merge_gap_ms,
        ),
        DetectionSource::Video => merge_ranges(
            &stillness,
            detection.min_static_duration_ms,
            detection.merge_gap_ms,
        ),
        DetectionSource::Both => {
            let merged_silence = merge_ranges(
                &silence,
                detection.min_silence_duration_ms,
                detection.merge_gap_ms,
            );
            let merged_static = merge_ranges(
                &stillness,
                detection.min_static_duration_ms,
                detection.merge_gap_ms,
            );
            combine_sources(&[&merged_silence, &merged_static])
        }
    };

    ProcessingPlan::new(config.mode, ranges)
}

/// Run the whole pipeline for one source file.
pub async fn process_video(
    source: &Path,
    config: &WorkerConfig,
    gate: &RenderGate,
    progress: ProgressFn,
) -> WorkerResult<PipelineOutcome> {
    let analysis = analyze_media(
        source,
        config,
        scaled(&progress, PhaseScale::new(0.0, 50.0)),
    )
    .await?;

    let plan = build_plan(&analysis, config);
    let stats = plan.stats(analysis.info.duration_ms());
    info!(
        ranges = stats.range_count,
        affected_ms = stats.affected_ms,
        affected_ratio = format!("{:.1}%", stats.affected_ratio * 100.0),
        "Plan built"
    );

    if plan.is_empty() {
        info!("No qualifying ranges found, nothing to do");
        return Ok(PipelineOutcome::NothingToDo);
    }

    // Exclusive access to the source for the render stage
    let _permit = gate.acquire(source)?;

    let request = RenderRequest {
        source: source.to_path_buf(),
        plan,
        settings: config.render.clone(),
        encoding: config.encoding.clone(),
        info: analysis.info,
    };

    match render(&request, scaled(&progress, PhaseScale::new(50.0, 50.0))).await {
        Ok(RenderOutcome::NothingToDo) => Ok(PipelineOutcome::NothingToDo),
        Ok(RenderOutcome::Rendered { output, backend }) => {
            progress(100, 100, "complete");
            info!(output = %output.display(), ?backend, "Render complete");
            Ok(PipelineOutcome::Rendered { output, backend })
        }
        Err(e @ MediaError::AllEncodersFailed(_)) => {
            warn!(error = %e, "Safe path exhausted all encoders");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadcut_models::{Sample, TimeRange, TransformMode};

    fn analysis_with(audio: Vec<Sample>, video: Vec<Sample>, duration: f64, fps: f64) -> MediaAnalysis {
        MediaAnalysis {
            info: VideoInfo {
                duration,
                width: 1920,
                height: 1080,
                fps,
                codec: "h264".to_string(),
                has_audio: !audio.is_empty(),
            },
            audio: AnalysisSummary::over_floor(audio, SILENCE_FLOOR_DB),
            video: AnalysisSummary::over_all(video),
        }
    }

    fn loud(db: f64, n: usize, offset: u64) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(offset + i as u64, db)).collect()
    }

    #[test]
    fn test_build_plan_audio_only() {
        let mut samples = loud(-20.0, 50, 0);
        samples.extend(loud(-80.0, 100, 50)); // silence [5000, 15000)
        samples.extend(loud(-20.0, 50, 150));

        let mut config = WorkerConfig::default();
        config.detection.source = DetectionSource::Audio;
        config.detection.silence_threshold_db = -40.0;

        let analysis = analysis_with(samples, Vec::new(), 20.0, 30.0);
        let plan = build_plan(&analysis, &config);

        assert_eq!(plan.ranges, vec![TimeRange::new(5000, 15_000)]);
        assert_eq!(plan.mode, TransformMode::Remove);
    }

    #[test]
    fn test_build_plan_combines_sources() {
        // Silence [0, 2000); stillness over frames 41-80 at 20 fps, which
        // detects as [2050, 4050)
        let mut audio = loud(-80.0, 20, 0);
        audio.extend(loud(-20.0, 180, 20));

        let video: Vec<Sample> = (1..=400)
            .map(|i| {
                let value = if (41..=80).contains(&i) { 0.0 } else { 5.0 };
                Sample::new(i, value)
            })
            .collect();

        let config = WorkerConfig::default();
        let analysis = analysis_with(audio, video, 20.0, 20.0);
        let plan = build_plan(&analysis, &config);

        // The audio and video ranges fuse in the cross-source pass
        // (gap 50ms < 100ms tolerance)
        assert_eq!(plan.ranges, vec![TimeRange::new(0, 4050)]);
    }

    #[test]
    fn test_build_plan_empty_when_no_dead_time() {
        let audio = loud(-20.0, 100, 0);
        let video: Vec<Sample> = (1..=100).map(|i| Sample::new(i, 5.0)).collect();

        let config = WorkerConfig::default();
        let analysis = analysis_with(audio, video, 10.0, 10.0);
        let plan = build_plan(&analysis, &config);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_detect_to_graph_end_to_end() {
        use deadcut_media::render::build_graph;
        use deadcut_media::FilterSegment;

        // 60s source, 100ms chunks, silence over [10000, 20000)
        let mut audio = loud(-20.0, 100, 0);
        audio.extend(loud(-80.0, 100, 100));
        audio.extend(loud(-20.0, 400, 200));

        let mut config = WorkerConfig::default();
        config.detection.source = DetectionSource::Audio;

        let analysis = analysis_with(audio, Vec::new(), 60.0, 30.0);
        let plan = build_plan(&analysis, &config);
        assert_eq!(plan.ranges, vec![TimeRange::new(10_000, 20_000)]);

        let request = RenderRequest {
            source: PathBuf::from("/tmp/in.mp4"),
            plan,
            settings: config.render.clone(),
            encoding: config.encoding.clone(),
            info: analysis.info.clone(),
        };
        let graph = build_graph(&request);

        // Default margins pre=2s/post=1s in remove mode
        assert_eq!(
            graph.segments,
            vec![
                FilterSegment::Passthrough {
                    start_ms: 0,
                    end_ms: 8_000
                },
                FilterSegment::Passthrough {
                    start_ms: 21_000,
                    end_ms: 60_000
                },
            ]
        );
    }

    #[test]
    fn test_scaled_progress_composition() {
        use std::sync::Mutex;

        let seen: Arc<Mutex<Vec<(u64, u64)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let progress: ProgressFn = Arc::new(move |v, m, _| {
            seen_clone.lock().unwrap().push((v, m));
        });

        let half = scaled(&progress, PhaseScale::new(50.0, 50.0));
        half(0, 10, "x");
        half(5, 10, "x");
        half(10, 10, "x");

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(50, 100), (75, 100), (100, 100)]);
    }
}
