//! Processing plans: the final, merged set of ranges to act on.

use serde::{Deserialize, Serialize};

use crate::range::TimeRange;

/// What the render stage does with each planned range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    /// Drop the range from the output entirely.
    Remove,
    /// Replay the range at increased speed with scaled-down audio volume.
    SpeedUp,
}

/// Ordered, disjoint, ascending set of ranges plus the treatment to apply.
///
/// Invariant: ranges are monotonically increasing and mutually disjoint with
/// gaps between them. A plan is only constructed from merger output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingPlan {
    pub mode: TransformMode,
    pub ranges: Vec<TimeRange>,
}

impl ProcessingPlan {
    pub fn new(mode: TransformMode, ranges: Vec<TimeRange>) -> Self {
        Self { mode, ranges }
    }

    /// No qualifying ranges survived merging; there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Summary statistics for logging and the skip heuristics.
    pub fn stats(&self, total_duration_ms: u64) -> PlanStats {
        let affected_ms: u64 = self.ranges.iter().map(|r| r.duration_ms()).sum();
        let kept_ms = total_duration_ms.saturating_sub(affected_ms);
        let affected_ratio = if total_duration_ms > 0 {
            affected_ms as f64 / total_duration_ms as f64
        } else {
            0.0
        };

        PlanStats {
            range_count: self.ranges.len(),
            affected_ms,
            kept_ms,
            affected_ratio,
        }
    }
}

/// Statistics about a processing plan relative to the source duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStats {
    /// Number of planned ranges.
    pub range_count: usize,
    /// Total duration covered by planned ranges.
    pub affected_ms: u64,
    /// Duration left untouched.
    pub kept_ms: u64,
    /// Fraction of the source covered by planned ranges (0.0 to 1.0).
    pub affected_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_stats() {
        let plan = ProcessingPlan::new(
            TransformMode::Remove,
            vec![TimeRange::new(0, 1000), TimeRange::new(5000, 7000)],
        );

        let stats = plan.stats(10_000);
        assert_eq!(stats.range_count, 2);
        assert_eq!(stats.affected_ms, 3000);
        assert_eq!(stats.kept_ms, 7000);
        assert!((stats.affected_ratio - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_empty_plan() {
        let plan = ProcessingPlan::new(TransformMode::SpeedUp, Vec::new());
        assert!(plan.is_empty());
        assert_eq!(plan.stats(10_000).affected_ms, 0);
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&TransformMode::SpeedUp).unwrap();
        assert_eq!(json, "\"speed_up\"");
        let mode: TransformMode = serde_json::from_str("\"remove\"").unwrap();
        assert_eq!(mode, TransformMode::Remove);
    }
}
