//! Phase-scaled progress mapping.
//!
//! Each pipeline phase reports `(value, max)` in its own units; a
//! `PhaseScale` maps that into the phase's slice of the overall 0-100
//! scale. Kept as a plain value type so the mapping is testable without a
//! callback in sight.

use serde::{Deserialize, Serialize};

/// Overall progress scale maximum.
pub const PROGRESS_MAX: u64 = 100;

/// Maps a phase-local `(value, max)` pair into `[offset, offset + span]` of
/// the overall 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseScale {
    /// Where this phase starts on the overall scale.
    pub offset: f64,
    /// How much of the overall scale this phase occupies.
    pub span: f64,
}

impl PhaseScale {
    pub fn new(offset: f64, span: f64) -> Self {
        Self { offset, span }
    }

    /// The full 0-100 scale as a single phase.
    pub fn full() -> Self {
        Self::new(0.0, PROGRESS_MAX as f64)
    }

    /// Map a phase-local value into the overall scale. `max == 0` maps to
    /// the phase start.
    pub fn apply(&self, value: u64, max: u64) -> u64 {
        if max == 0 {
            return self.offset.round() as u64;
        }
        let fraction = (value as f64 / max as f64).clamp(0.0, 1.0);
        (self.offset + fraction * self.span).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_identity() {
        let scale = PhaseScale::full();
        assert_eq!(scale.apply(0, 100), 0);
        assert_eq!(scale.apply(50, 100), 50);
        assert_eq!(scale.apply(100, 100), 100);
    }

    #[test]
    fn test_second_half_phase() {
        let scale = PhaseScale::new(50.0, 50.0);
        assert_eq!(scale.apply(0, 200), 50);
        assert_eq!(scale.apply(100, 200), 75);
        assert_eq!(scale.apply(200, 200), 100);
    }

    #[test]
    fn test_zero_max_maps_to_phase_start() {
        let scale = PhaseScale::new(25.0, 50.0);
        assert_eq!(scale.apply(10, 0), 25);
    }

    #[test]
    fn test_overshoot_clamped() {
        let scale = PhaseScale::new(0.0, 50.0);
        assert_eq!(scale.apply(300, 100), 50);
    }
}
