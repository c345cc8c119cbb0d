//! Threshold detectors: silence over loudness samples, stillness over
//! motion samples.
//!
//! Both walk their sample sequence in order with an open/closed state
//! machine: crossing below the threshold opens a range at the sample's
//! nominal start time, crossing back closes it. A run still open when the
//! samples end closes at the stream's total duration.

use deadcut_models::{Sample, TimeRange, SILENCE_FLOOR_DB};

/// Detect contiguous silent ranges in a per-chunk loudness sequence.
///
/// A chunk is silent if its loudness is below `threshold_db` or it was
/// floor-filled for true zero energy (which keeps absurdly low thresholds
/// from ever classifying digital silence as sound). `total_ms` closes a
/// trailing run.
pub fn detect_silence(
    samples: &[Sample],
    threshold_db: f64,
    chunk_ms: u64,
    total_ms: u64,
) -> Vec<TimeRange> {
    let mut ranges = Vec::new();
    let mut open_since: Option<u64> = None;

    for sample in samples {
        let time_ms = sample.index * chunk_ms;
        let is_silent = sample.value < threshold_db || sample.value <= SILENCE_FLOOR_DB;

        match (open_since, is_silent) {
            (None, true) => open_since = Some(time_ms),
            (Some(start), false) => {
                if time_ms > start {
                    ranges.push(TimeRange::new(start, time_ms));
                }
                open_since = None;
            }
            _ => {}
        }
    }

    if let Some(start) = open_since {
        if total_ms > start {
            ranges.push(TimeRange::new(start, total_ms));
        }
    }

    ranges
}

/// Detect contiguous static (motionless) ranges in a per-frame-pair motion
/// sequence.
///
/// Sample indices are frame numbers at the source frame rate; `fps`
/// converts them to milliseconds. A run still open at the end closes at
/// `total_frames` converted to milliseconds.
pub fn detect_static(
    samples: &[Sample],
    threshold: f64,
    fps: f64,
    total_frames: u64,
) -> Vec<TimeRange> {
    let fps = if fps > 0.0 { fps } else { 30.0 };
    let to_ms = |frame: u64| (frame as f64 / fps * 1000.0).round() as u64;

    let mut ranges = Vec::new();
    let mut open_since: Option<u64> = None;

    for sample in samples {
        let is_static = sample.value < threshold;

        match (open_since, is_static) {
            (None, true) => open_since = Some(sample.index),
            (Some(start_frame), false) => {
                let start_ms = to_ms(start_frame);
                let end_ms = to_ms(sample.index);
                if end_ms > start_ms {
                    ranges.push(TimeRange::new(start_ms, end_ms));
                }
                open_since = None;
            }
            _ => {}
        }
    }

    if let Some(start_frame) = open_since {
        let start_ms = to_ms(start_frame);
        let end_ms = to_ms(total_frames);
        if end_ms > start_ms {
            ranges.push(TimeRange::new(start_ms, end_ms));
        }
    }

    ranges
}
