//! Trim/transform/concat filter-graph construction.
//!
//! A `FilterGraph` is an ordered list of segment descriptors over the source
//! timeline plus one concat node per media type. In speed-up mode the
//! segments exactly tile `[0, duration)`; in remove mode the planned ranges
//! (expanded by the margins) produce no segment and are thereby dropped
//! from the output.

use serde::{Deserialize, Serialize};

use deadcut_models::{ProcessingPlan, RenderSettings, TransformMode};

/// The atempo filter accepts at most this multiplier per stage; larger
/// factors are decomposed into a chain.
pub const ATEMPO_STAGE_CAP: f64 = 100.0;

/// One contiguous span of the source with a single treatment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FilterSegment {
    /// Copied through at normal speed.
    Passthrough { start_ms: u64, end_ms: u64 },
    /// Replayed at `factor` speed with audio scaled to `volume`.
    Transform {
        start_ms: u64,
        end_ms: u64,
        factor: f64,
        volume: f64,
    },
}

impl FilterSegment {
    pub fn start_ms(&self) -> u64 {
        match self {
            Self::Passthrough { start_ms, .. } | Self::Transform { start_ms, .. } => *start_ms,
        }
    }

    pub fn end_ms(&self) -> u64 {
        match self {
            Self::Passthrough { end_ms, .. } | Self::Transform { end_ms, .. } => *end_ms,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms().saturating_sub(self.start_ms())
    }
}

/// An ordered segment list ready to be rendered, by either backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterGraph {
    pub segments: Vec<FilterSegment>,
    /// Source frame rate, used to normalize the video concat output.
    pub fps: f64,
    /// Whether audio filter chains are built alongside the video ones.
    pub has_audio: bool,
}

impl FilterGraph {
    /// Number of segment descriptors; the backend selector's cost proxy.
    pub fn stream_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render the video `filter_complex` string: one trim/setpts chain per
    /// segment, joined by a concat node labeled `[outv]`.
    pub fn video_filter_complex(&self) -> String {
        let mut filters = Vec::with_capacity(self.segments.len() + 1);
        let mut concat_inputs = String::new();

        for (i, segment) in self.segments.iter().enumerate() {
            let start = segment.start_ms() as f64 / 1000.0;
            let end = segment.end_ms() as f64 / 1000.0;
            let chain = match segment {
                FilterSegment::Passthrough { .. } => format!(
                    "[0:v]trim=start={start:.3}:end={end:.3},setpts=PTS-STARTPTS[v{i}]"
                ),
                FilterSegment::Transform { factor, .. } => format!(
                    "[0:v]trim=start={start:.3}:end={end:.3},setpts=PTS/{factor}-STARTPTS[v{i}]"
                ),
            };
            filters.push(chain);
            concat_inputs.push_str(&format!("[v{i}]"));
        }

        filters.push(format!(
            "{concat_inputs}concat=n={}:v=1:a=0,fps={}[outv]",
            self.segments.len(),
            self.fps
        ));
        filters.join(";")
    }

    /// Render the audio `filter_complex` string, or `None` for silent
    /// sources. Transform segments chain tempo stages and a volume scale.
    pub fn audio_filter_complex(&self) -> Option<String> {
        if !self.has_audio || self.segments.is_empty() {
            return None;
        }

        let mut filters = Vec::with_capacity(self.segments.len() + 1);
        let mut concat_inputs = String::new();

        for (i, segment) in self.segments.iter().enumerate() {
            let start = segment.start_ms() as f64 / 1000.0;
            let end = segment.end_ms() as f64 / 1000.0;
            let chain = match segment {
                FilterSegment::Passthrough { .. } => format!(
                    "[0:a]atrim=start={start:.3}:end={end:.3},asetpts=PTS-STARTPTS[a{i}]"
                ),
                FilterSegment::Transform { factor, volume, .. } => {
                    let mut stages = String::from("asetpts=PTS-STARTPTS");
                    for stage in atempo_chain(*factor) {
                        stages.push_str(&format!(",atempo={stage:.4}"));
                    }
                    stages.push_str(&format!(",volume={volume:.4}"));
                    format!("[0:a]atrim=start={start:.3}:end={end:.3},{stages}[a{i}]")
                }
            };
            filters.push(chain);
            concat_inputs.push_str(&format!("[a{i}]"));
        }

        filters.push(format!(
            "{concat_inputs}concat=n={}:v=0:a=1[outa]",
            self.segments.len()
        ));
        Some(filters.join(";"))
    }
}

/// Decompose a speed factor into bounded atempo stages whose product equals
/// the factor. Factors at or below 1.0 need no stage.
pub fn atempo_chain(factor: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut remaining = factor;
    while remaining > ATEMPO_STAGE_CAP {
        stages.push(ATEMPO_STAGE_CAP);
        remaining /= ATEMPO_STAGE_CAP;
    }
    if remaining > 1.0 {
        stages.push(remaining);
    }
    stages
}

/// Builds a `FilterGraph` from a processing plan.
pub struct FilterGraphBuilder<'a> {
    plan: &'a ProcessingPlan,
    settings: &'a RenderSettings,
    duration_ms: u64,
    fps: f64,
    has_audio: bool,
}

impl<'a> FilterGraphBuilder<'a> {
    pub fn new(
        plan: &'a ProcessingPlan,
        settings: &'a RenderSettings,
        duration_ms: u64,
        fps: f64,
        has_audio: bool,
    ) -> Self {
        Self {
            plan,
            settings,
            duration_ms,
            fps,
            has_audio,
        }
    }

    /// Walk the plan in order, emitting a passthrough for everything before
    /// each range's margin-expanded start, then (in speed-up mode) a
    /// transform over the expanded range itself. Expanded boundaries are
    /// clamped to the timeline and to the previous segment's end, so
    /// margin overlap collapses a segment rather than reordering the graph;
    /// zero-length segments are dropped.
    pub fn build(&self) -> FilterGraph {
        let pre = self.settings.pre_margin_ms();
        let post = self.settings.post_margin_ms();
        let factor = self.settings.speedup_factor;
        let volume = self.settings.speedup_volume();

        let mut segments = Vec::new();
        let mut cursor: u64 = 0;

        for range in &self.plan.ranges {
            let expanded_start = range.start_ms.saturating_sub(pre).max(cursor);
            let expanded_end = (range.end_ms + post).min(self.duration_ms).max(expanded_start);

            if expanded_start > cursor {
                segments.push(FilterSegment::Passthrough {
                    start_ms: cursor,
                    end_ms: expanded_start,
                });
            }

            if self.plan.mode == TransformMode::SpeedUp && expanded_end > expanded_start {
                segments.push(FilterSegment::Transform {
                    start_ms: expanded_start,
                    end_ms: expanded_end,
                    factor,
                    volume,
                });
            }

            cursor = cursor.max(expanded_end);
        }

        if self.duration_ms > cursor {
            segments.push(FilterSegment::Passthrough {
                start_ms: cursor,
                end_ms: self.duration_ms,
            });
        }

        FilterGraph {
            segments,
            fps: self.fps,
            has_audio: self.has_audio,
        }
    }
}
