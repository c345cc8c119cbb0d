//! Render backend selection and execution.
//!
//! The selector is an explicit state machine:
//! `Estimate → {FastPath, SafePath} → {Done, Failed}`. The fast path is a
//! single-pass filter-graph transcode whose external executor has a hard
//! ceiling on chained stream operations; the safe path materializes and
//! joins segments one by one and has no such ceiling, so it doubles as the
//! universal fallback. A fast-path failure downgrades to the safe path
//! exactly once; a safe-path failure is terminal.

mod fast;
mod safe;

use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use deadcut_models::{EncodingConfig, ProcessingPlan, RenderSettings};

use crate::command::check_ffmpeg;
use crate::error::MediaResult;
use crate::graph::{FilterGraph, FilterGraphBuilder};
use crate::output::output_path_for;
use crate::probe::VideoInfo;
use crate::progress::ProgressFn;

pub use fast::run_fast_path;
pub use safe::run_safe_path;

/// Everything needed to render one source. Constructed fresh per
/// invocation and not shared across renders.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: PathBuf,
    pub plan: ProcessingPlan,
    pub settings: RenderSettings,
    pub encoding: EncodingConfig,
    pub info: VideoInfo,
}

/// Which backend produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBackend {
    Fast,
    Safe,
}

/// Result of a render invocation.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// The plan was empty; no output was produced. Not an error.
    NothingToDo,
    /// The output file was written.
    Rendered {
        output: PathBuf,
        backend: RenderBackend,
    },
}

/// Selector state. `Done`/`Failed` are represented by returning.
enum State {
    Estimate,
    FastPath,
    SafePath,
}

/// Stream-count proxy for the single-pass executor's cost: each plan range
/// contributes a trimmed segment and a gap segment, plus the tail.
///
/// This intentionally ignores whether audio doubles the true operation
/// count; the cap it is compared against is configurable and should be
/// calibrated against the actual tool rather than trusted as exact.
pub fn estimate_stream_count(range_count: usize) -> usize {
    range_count * 2 + 1
}

/// Render a request to completion, downgrading fast→safe at most once.
pub async fn render(request: &RenderRequest, progress: ProgressFn) -> MediaResult<RenderOutcome> {
    if request.plan.is_empty() {
        info!("Plan is empty, nothing to do");
        return Ok(RenderOutcome::NothingToDo);
    }

    check_ffmpeg()?;

    let job_id = Uuid::new_v4();
    let duration_ms = request.info.duration_ms();
    let graph = build_graph(request);

    let output = output_path_for(&request.source).await?;

    let mut state = State::Estimate;
    loop {
        match state {
            State::Estimate => {
                let estimate = estimate_stream_count(request.plan.len());
                let cap = request.settings.max_concat_streams;

                state = match select_backend(&request.plan, &request.settings) {
                    RenderBackend::Fast => {
                        info!(job_id = %job_id, estimate, cap, "Using fast path");
                        State::FastPath
                    }
                    RenderBackend::Safe => {
                        info!(
                            job_id = %job_id,
                            estimate,
                            cap,
                            use_fast_path = request.settings.use_fast_path,
                            "Using safe path"
                        );
                        State::SafePath
                    }
                };
            }
            State::FastPath => {
                match fast::run_fast_path(
                    &request.source,
                    &graph,
                    &output,
                    &request.encoding,
                    duration_ms,
                    progress.clone(),
                )
                .await
                {
                    Ok(()) => {
                        return Ok(RenderOutcome::Rendered {
                            output,
                            backend: RenderBackend::Fast,
                        });
                    }
                    // The safe path needs the same external tool
                    Err(e) if e.is_tool_missing() => return Err(e),
                    Err(e) => {
                        // Recovered locally; the single allowed downgrade
                        warn!(job_id = %job_id, error = %e, "Fast path failed, falling back to safe path");
                        let _ = tokio::fs::remove_file(&output).await;
                        state = State::SafePath;
                    }
                }
            }
            State::SafePath => {
                safe::run_safe_path(
                    &request.source,
                    &graph,
                    &output,
                    &request.encoding,
                    progress.clone(),
                )
                .await?;
                return Ok(RenderOutcome::Rendered {
                    output,
                    backend: RenderBackend::Safe,
                });
            }
        }
    }
}

/// Decide the initial backend without executing anything. Exposed so the
/// selection rule is testable in isolation.
pub fn select_backend(plan: &ProcessingPlan, settings: &RenderSettings) -> RenderBackend {
    if !settings.use_fast_path || estimate_stream_count(plan.len()) > settings.max_concat_streams {
        RenderBackend::Safe
    } else {
        RenderBackend::Fast
    }
}

/// Build the filter graph for a request.
pub fn build_graph(request: &RenderRequest) -> FilterGraph {
    FilterGraphBuilder::new(
        &request.plan,
        &request.settings,
        request.info.duration_ms(),
        request.info.fps,
        request.info.has_audio,
    )
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadcut_models::{TimeRange, TransformMode};

    fn plan_with_ranges(n: usize) -> ProcessingPlan {
        let ranges = (0..n)
            .map(|i| TimeRange::new(i as u64 * 2000, i as u64 * 2000 + 1000))
            .collect();
        ProcessingPlan::new(TransformMode::Remove, ranges)
    }

    #[test]
    fn test_estimate_formula() {
        assert_eq!(estimate_stream_count(0), 1);
        assert_eq!(estimate_stream_count(10), 21);
        assert_eq!(estimate_stream_count(30), 61);
    }

    #[test]
    fn test_selection_over_cap_forces_safe() {
        let settings = RenderSettings {
            max_concat_streams: 50,
            ..RenderSettings::default()
        };
        // 30 ranges: 61 streams > 50
        assert_eq!(
            select_backend(&plan_with_ranges(30), &settings),
            RenderBackend::Safe
        );
        // 10 ranges: 21 streams <= 50
        assert_eq!(
            select_backend(&plan_with_ranges(10), &settings),
            RenderBackend::Fast
        );
    }

    #[test]
    fn test_selection_respects_fast_path_flag() {
        let settings = RenderSettings {
            use_fast_path: false,
            ..RenderSettings::default()
        };
        assert_eq!(
            select_backend(&plan_with_ranges(1), &settings),
            RenderBackend::Safe
        );
    }
}
