//! Range merging and cross-source combination.

use deadcut_models::TimeRange;

/// Gap tolerance and minimum duration for the second merge pass when audio
/// and video detections are combined.
pub const CROSS_SOURCE_GAP_MS: u64 = 100;
pub const CROSS_SOURCE_MIN_DURATION_MS: u64 = 100;

/// Merge near or overlapping ranges and drop the ones that stay too short.
///
/// Input need not be sorted or disjoint. Ranges whose start lies within
/// `gap_ms` of the running range's end are merged into it; an accumulated
/// range is emitted only if its duration reaches `min_duration_ms`. The
/// output is sorted, pairwise disjoint, and idempotent under re-merging
/// with the same parameters.
pub fn merge_ranges(ranges: &[TimeRange], min_duration_ms: u64, gap_ms: u64) -> Vec<TimeRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.start_ms);

    let mut merged = Vec::new();
    let mut current_start = sorted[0].start_ms;
    let mut current_end = sorted[0].end_ms;

    for range in &sorted[1..] {
        if range.start_ms < current_end + gap_ms {
            current_end = current_end.max(range.end_ms);
        } else {
            if current_end - current_start >= min_duration_ms {
                merged.push(TimeRange::new(current_start, current_end));
            }
            current_start = range.start_ms;
            current_end = range.end_ms;
        }
    }

    if current_end - current_start >= min_duration_ms {
        merged.push(TimeRange::new(current_start, current_end));
    }

    merged
}

/// Combine already-merged range lists from independent detection sources.
///
/// Each source is merged with its own minimum-duration setting before this
/// call; the concatenation then goes through one more pass with a small
/// fixed gap tolerance so adjacent audio- and video-derived ranges fuse.
pub fn combine_sources(sources: &[&[TimeRange]]) -> Vec<TimeRange> {
    let all: Vec<TimeRange> = sources.iter().flat_map(|s| s.iter().copied()).collect();
    merge_ranges(&all, CROSS_SOURCE_MIN_DURATION_MS, CROSS_SOURCE_GAP_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_within_tolerance_merges() {
        let ranges = vec![TimeRange::new(0, 100), TimeRange::new(150, 300)];
        let merged = merge_ranges(&ranges, 50, 100);
        assert_eq!(merged, vec![TimeRange::new(0, 300)]);
    }

    #[test]
    fn test_gap_beyond_tolerance_stays_split() {
        let ranges = vec![TimeRange::new(0, 100), TimeRange::new(300, 400)];
        let merged = merge_ranges(&ranges, 50, 100);
        assert_eq!(merged, vec![TimeRange::new(0, 100), TimeRange::new(300, 400)]);
    }

    #[test]
    fn test_below_minimum_dropped() {
        let ranges = vec![TimeRange::new(0, 30)];
        let merged = merge_ranges(&ranges, 50, 100);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_ranges(&[], 50, 100).is_empty());
    }

    #[test]
    fn test_unsorted_input() {
        let ranges = vec![
            TimeRange::new(500, 700),
            TimeRange::new(0, 100),
            TimeRange::new(80, 200),
        ];
        let merged = merge_ranges(&ranges, 50, 50);
        assert_eq!(merged, vec![TimeRange::new(0, 200), TimeRange::new(500, 700)]);
    }

    #[test]
    fn test_contained_range_absorbed() {
        let ranges = vec![TimeRange::new(0, 1000), TimeRange::new(200, 300)];
        let merged = merge_ranges(&ranges, 50, 0);
        assert_eq!(merged, vec![TimeRange::new(0, 1000)]);
    }

    #[test]
    fn test_idempotent() {
        let ranges = vec![
            TimeRange::new(0, 100),
            TimeRange::new(150, 300),
            TimeRange::new(900, 1400),
        ];
        let once = merge_ranges(&ranges, 50, 100);
        let twice = merge_ranges(&once, 50, 100);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_disjoint_and_long_enough() {
        let ranges = vec![
            TimeRange::new(0, 60),
            TimeRange::new(70, 120),
            TimeRange::new(500, 520),
            TimeRange::new(900, 1200),
        ];
        let merged = merge_ranges(&ranges, 100, 50);

        for pair in merged.windows(2) {
            assert!(pair[0].end_ms < pair[1].start_ms);
        }
        for range in &merged {
            assert!(range.duration_ms() >= 100);
        }
    }

    #[test]
    fn test_combine_sources_fuses_adjacent() {
        let silence = vec![TimeRange::new(0, 1000)];
        let stillness = vec![TimeRange::new(1050, 2000)];
        let combined = combine_sources(&[&silence, &stillness]);
        assert_eq!(combined, vec![TimeRange::new(0, 2000)]);
    }

    #[test]
    fn test_combine_sources_keeps_distant() {
        let silence = vec![TimeRange::new(0, 1000)];
        let stillness = vec![TimeRange::new(5000, 6000)];
        let combined = combine_sources(&[&silence, &stillness]);
        assert_eq!(combined.len(), 2);
    }
}
