//! Analysis samples and summary statistics.

use serde::{Deserialize, Serialize};

/// Floor value assigned to chunks with exactly zero energy (true digital
/// silence). dBFS of silence is -inf; the floor keeps the sequence numeric.
pub const SILENCE_FLOOR_DB: f64 = -90.0;

/// A single scalar measurement in a fixed-rate sequence.
///
/// `index` is the chunk index for audio (at the configured chunk duration)
/// or the frame-pair index for video (at the source frame rate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Position in the sequence.
    pub index: u64,
    /// Measured value (loudness in dBFS, or motion magnitude).
    pub value: f64,
}

impl Sample {
    pub fn new(index: u64, value: f64) -> Self {
        Self { index, value }
    }
}

/// Summary of an analysis pass over one media stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Minimum over valid samples.
    pub min: f64,
    /// Maximum over valid samples.
    pub max: f64,
    /// Mean over valid samples.
    pub mean: f64,
    /// The full, positionally-aligned sample sequence (including any
    /// floor-filled entries).
    pub samples: Vec<Sample>,
}

impl AnalysisSummary {
    /// Summarize a loudness sequence, ignoring floor-filled entries for the
    /// statistics. If no sample is above `floor`, min/max/mean all collapse
    /// to `floor` while the sample list is returned unchanged so downstream
    /// thresholding stays positionally aligned with time.
    pub fn over_floor(samples: Vec<Sample>, floor: f64) -> Self {
        let valid: Vec<f64> = samples
            .iter()
            .map(|s| s.value)
            .filter(|v| *v > floor)
            .collect();

        if valid.is_empty() {
            return Self {
                min: floor,
                max: floor,
                mean: floor,
                samples,
            };
        }

        let min = valid.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = valid.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;

        Self {
            min,
            max,
            mean,
            samples,
        }
    }

    /// Summarize a sequence where every sample is valid (motion magnitudes).
    pub fn over_all(samples: Vec<Sample>) -> Self {
        if samples.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                samples,
            };
        }

        let min = samples.iter().map(|s| s.value).fold(f64::INFINITY, f64::min);
        let max = samples
            .iter()
            .map(|s| s.value)
            .fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64;

        Self {
            min,
            max,
            mean,
            samples,
        }
    }

    /// A summary representing a skipped analysis (no usable data).
    pub fn skipped(floor: f64) -> Self {
        Self {
            min: floor,
            max: floor,
            mean: floor,
            samples: Vec::new(),
        }
    }

    /// Number of samples in the sequence.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::new(i as u64, *v))
            .collect()
    }

    #[test]
    fn test_stats_ignore_floor() {
        let summary = AnalysisSummary::over_floor(
            samples(&[SILENCE_FLOOR_DB, -30.0, -20.0, SILENCE_FLOOR_DB, -40.0]),
            SILENCE_FLOOR_DB,
        );

        assert!((summary.min - (-40.0)).abs() < f64::EPSILON);
        assert!((summary.max - (-20.0)).abs() < f64::EPSILON);
        assert!((summary.mean - (-30.0)).abs() < f64::EPSILON);
        // The floor entries stay in the sequence.
        assert_eq!(summary.len(), 5);
    }

    #[test]
    fn test_all_floor_collapses_to_floor() {
        let summary = AnalysisSummary::over_floor(
            samples(&[SILENCE_FLOOR_DB, SILENCE_FLOOR_DB]),
            SILENCE_FLOOR_DB,
        );

        assert_eq!(summary.min, SILENCE_FLOOR_DB);
        assert_eq!(summary.max, SILENCE_FLOOR_DB);
        assert_eq!(summary.mean, SILENCE_FLOOR_DB);
        assert_eq!(summary.len(), 2);
    }

    #[test]
    fn test_over_all_empty() {
        let summary = AnalysisSummary::over_all(Vec::new());
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 0.0);
        assert_eq!(summary.mean, 0.0);
        assert!(summary.is_empty());
    }

    #[test]
    fn test_over_all_stats() {
        let summary = AnalysisSummary::over_all(samples(&[1.0, 3.0, 2.0]));
        assert!((summary.min - 1.0).abs() < f64::EPSILON);
        assert!((summary.max - 3.0).abs() < f64::EPSILON);
        assert!((summary.mean - 2.0).abs() < f64::EPSILON);
    }
}
