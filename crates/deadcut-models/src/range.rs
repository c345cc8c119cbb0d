//! Time ranges on the source timeline.

use serde::{Deserialize, Serialize};

/// A half-open time interval `[start_ms, end_ms)` relative to the source start.
///
/// A collection of ranges is never assumed sorted or non-overlapping until it
/// has been through the range merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start time in milliseconds.
    pub start_ms: u64,
    /// End time in milliseconds (exclusive, greater than `start_ms`).
    pub end_ms: u64,
}

impl TimeRange {
    /// Create a new range. Callers are expected to pass `end_ms > start_ms`.
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Duration of this range in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Duration of this range in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() as f64 / 1000.0
    }
}
